//! Device inventory handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::de::{self, Error as _};
use serde::{Deserialize, Deserializer, Serialize};

use netzone_core::{
    Device, DeviceFilter, DeviceId, DeviceStats, DeviceUpdate, NewDevice, ZoneId,
};

use super::error::ApiError;
use super::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// List filters. The dashboard sends `router_zone_id` and `is_active=1`.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceQuery {
    #[serde(alias = "zone_id")]
    pub router_zone_id: Option<i64>,
    #[serde(default, deserialize_with = "flag")]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub unassigned: Option<bool>,
}

impl DeviceQuery {
    fn filter(&self) -> DeviceFilter {
        let filter = match (self.unassigned.unwrap_or(false), self.router_zone_id) {
            (true, _) => DeviceFilter::unassigned(),
            (false, Some(id)) => DeviceFilter::zone(ZoneId(id)),
            (false, None) => DeviceFilter::ALL,
        };
        if self.is_active.unwrap_or(false) {
            filter.active()
        } else {
            filter
        }
    }
}

/// Query-string booleans: `1`/`0` as well as `true`/`false`.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.map(|raw| match raw.as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(D::Error::invalid_value(
            de::Unexpected::Str(other),
            &"1, 0, true or false",
        )),
    })
    .transpose()
}

/// `router_zone_id: null` moves the device back to unassigned.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub router_zone_id: Option<ZoneId>,
}

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub success: bool,
    pub device: Device,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: DeviceStats,
}

pub async fn list_devices(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DeviceQuery>,
) -> Result<Json<DevicesResponse>, ApiError> {
    let devices = state.engine.devices(query.filter()).await?;
    Ok(Json(DevicesResponse { devices }))
}

pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device = state.engine.device(DeviceId(id)).await?;
    Ok(Json(DeviceResponse {
        success: true,
        device,
    }))
}

pub async fn create_device(
    State(state): State<AppState>,
    ApiJson(device): ApiJson<NewDevice>,
) -> Result<(StatusCode, Json<DeviceResponse>), ApiError> {
    state.ensure_writable()?;
    let device = state.engine.create_device(device).await?;
    Ok((
        StatusCode::CREATED,
        Json(DeviceResponse {
            success: true,
            device,
        }),
    ))
}

pub async fn assign_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<AssignRequest>,
) -> Result<Json<DeviceResponse>, ApiError> {
    state.ensure_writable()?;
    let device = state
        .engine
        .assign_device(DeviceId(id), req.router_zone_id)
        .await?;
    Ok(Json(DeviceResponse {
        success: true,
        device,
    }))
}

/// Edit from the device form. A `router_zone_id` key moves the device,
/// `null` unassigns it.
pub async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(update): ApiJson<DeviceUpdate>,
) -> Result<Json<DeviceResponse>, ApiError> {
    state.ensure_writable()?;
    let device = state.engine.update_device(DeviceId(id), &update).await?;
    Ok(Json(DeviceResponse {
        success: true,
        device,
    }))
}

pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeviceResponse>, ApiError> {
    state.ensure_writable()?;
    let device = state.engine.delete_device(DeviceId(id)).await?;
    Ok(Json(DeviceResponse {
        success: true,
        device,
    }))
}

pub async fn device_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.engine.stats().await?;
    Ok(Json(StatsResponse { stats }))
}
