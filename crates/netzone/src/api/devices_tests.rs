use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::Json;

use netzone_core::{DeviceIdentifier, DeviceUpdate, NewDevice, NewZone, ZoneId};

use super::devices::{
    AssignRequest, DeviceQuery, assign_device, create_device, delete_device, device_stats,
    get_device, list_devices, update_device,
};
use super::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use crate::test_helpers::{read_only_app_state, test_app_state};

fn printer() -> NewDevice {
    let mut device = NewDevice::discovered(&DeviceIdentifier::new("AA-BB-CC-DD-EE-FF"), None);
    device.device_name = "Printer".into();
    device
}

fn query(uri: &'static str) -> ApiQuery<DeviceQuery> {
    let Query(query) = Query::try_from_uri(&Uri::from_static(uri)).unwrap();
    ApiQuery(query)
}

async fn lab_zone(state: &AppState) -> ZoneId {
    state
        .engine
        .create_zone(NewZone {
            router_identifier: "lab".into(),
            zone_name: "Lab".into(),
            router_name: None,
            description: None,
            is_active: true,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_create_device_normalizes_identifier() {
    let state = test_app_state();
    let (status, Json(resp)) = create_device(State(state.clone()), ApiJson(printer()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp.device.device_identifier.as_str(), "aa:bb:cc:dd:ee:ff");

    let Json(fetched) = get_device(State(state), Path(resp.device.id.0)).await.unwrap();
    assert_eq!(fetched.device.device_name, "Printer");
}

#[tokio::test]
async fn test_list_devices_filters_unassigned() {
    let state = test_app_state();
    create_device(State(state.clone()), ApiJson(printer()))
        .await
        .unwrap();

    let Json(all) = list_devices(State(state.clone()), ApiQuery(DeviceQuery::default()))
        .await
        .unwrap();
    assert_eq!(all.devices.len(), 1);

    let Json(in_default) = list_devices(State(state.clone()), query("/devices?zone_id=1"))
        .await
        .unwrap();
    assert!(in_default.devices.is_empty());

    let Json(unassigned) = list_devices(State(state), query("/devices?unassigned=true"))
        .await
        .unwrap();
    assert_eq!(unassigned.devices.len(), 1);
}

#[tokio::test]
async fn test_list_devices_with_dashboard_filters() {
    let state = test_app_state();
    let lab = lab_zone(&state).await;
    let mut camera =
        NewDevice::discovered(&DeviceIdentifier::new("aa:bb:cc:00:00:01"), Some(lab));
    camera.device_name = "Camera".into();
    create_device(State(state.clone()), ApiJson(camera))
        .await
        .unwrap();
    let mut retired =
        NewDevice::discovered(&DeviceIdentifier::new("aa:bb:cc:00:00:02"), Some(lab));
    retired.is_active = false;
    create_device(State(state.clone()), ApiJson(retired))
        .await
        .unwrap();
    create_device(State(state.clone()), ApiJson(printer()))
        .await
        .unwrap();

    let Json(in_lab) = list_devices(
        State(state.clone()),
        query("/devices?is_active=1&router_zone_id=2"),
    )
    .await
    .unwrap();
    assert_eq!(lab, ZoneId(2));
    assert_eq!(in_lab.devices.len(), 1);
    assert_eq!(in_lab.devices[0].device_name, "Camera");

    let Json(active) = list_devices(State(state), query("/devices?is_active=1"))
        .await
        .unwrap();
    assert_eq!(active.devices.len(), 2);
}

#[tokio::test]
async fn test_assign_device_updates_stats() {
    let state = test_app_state();
    let (_, Json(created)) = create_device(State(state.clone()), ApiJson(printer()))
        .await
        .unwrap();

    let Json(stats) = device_stats(State(state.clone())).await.unwrap();
    assert_eq!(stats.stats.unassigned_devices, 1);

    let Json(assigned) = assign_device(
        State(state.clone()),
        Path(created.device.id.0),
        ApiJson(AssignRequest {
            router_zone_id: Some(ZoneId(1)),
        }),
    )
    .await
    .unwrap();
    assert_eq!(assigned.device.router_zone_id, Some(ZoneId(1)));

    let Json(stats) = device_stats(State(state)).await.unwrap();
    assert_eq!(stats.stats.unassigned_devices, 0);
    assert_eq!(stats.stats.zone(ZoneId(1)).unwrap().device_count, 1);
}

#[tokio::test]
async fn test_assign_to_missing_zone_is_not_found() {
    let state = test_app_state();
    let (_, Json(created)) = create_device(State(state.clone()), ApiJson(printer()))
        .await
        .unwrap();
    let err = assign_device(
        State(state),
        Path(created.device.id.0),
        ApiJson(AssignRequest {
            router_zone_id: Some(ZoneId(99)),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_device_from_edit_form() {
    let state = test_app_state();
    let lab = lab_zone(&state).await;
    let (_, Json(created)) = create_device(State(state.clone()), ApiJson(printer()))
        .await
        .unwrap();

    let form: DeviceUpdate = serde_json::from_value(serde_json::json!({
        "device_name": "Lab printer",
        "device_identifier": "AA-BB-CC-DD-EE-FF",
        "device_type": "",
        "description": "",
        "is_active": true,
        "router_zone_id": lab.0,
    }))
    .unwrap();
    let Json(updated) = update_device(
        State(state.clone()),
        Path(created.device.id.0),
        ApiJson(form),
    )
    .await
    .unwrap();
    assert_eq!(updated.device.device_name, "Lab printer");
    assert_eq!(updated.device.router_zone_id, Some(lab));
    assert_eq!(updated.device.description, None);

    let Json(stats) = device_stats(State(state)).await.unwrap();
    assert_eq!(stats.stats.zone(lab).unwrap().device_count, 1);
}

#[tokio::test]
async fn test_delete_device() {
    let state = test_app_state();
    let (_, Json(created)) = create_device(State(state.clone()), ApiJson(printer()))
        .await
        .unwrap();

    let Json(deleted) = delete_device(State(state.clone()), Path(created.device.id.0))
        .await
        .unwrap();
    assert!(deleted.success);
    assert_eq!(deleted.device.id, created.device.id);

    let err = delete_device(State(state), Path(created.device.id.0))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_device_edits_refused_when_read_only() {
    let state = read_only_app_state();
    let err = update_device(State(state.clone()), Path(1), ApiJson(DeviceUpdate::default()))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::FORBIDDEN);

    let err = delete_device(State(state), Path(1)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_missing_device_is_not_found() {
    let state = test_app_state();
    let err = get_device(State(state), Path(42)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}
