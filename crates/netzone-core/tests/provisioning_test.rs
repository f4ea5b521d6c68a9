#![allow(clippy::unwrap_used)]
// End-to-end resolution and provisioning through `Engine`.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use netzone_core::{
    CoreError, DeviceDecision, DeviceFilter, Engine, IdentityQuery, IngestPipeline, MappingType,
    NetifySettings, PolicyPatch, TelemetryRecord, ZoneDecision, ZoneId, ZonePreview,
};

// ── Helpers ─────────────────────────────────────────────────────────

const MAPPED_IP: &str = "10.1.0.1";
const UNMAPPED_IP: &str = "10.9.9.9";
const UNSEEN_ZONE: &str = "router_branch_007";

async fn engine_with(settings: NetifySettings) -> Engine {
    let engine = Engine::in_memory();
    engine
        .add_mapping(MappingType::RouterIdentifierMapping, MAPPED_IP, UNSEEN_ZONE)
        .await
        .unwrap();
    engine
        .update_policy(&PolicyPatch {
            allow_unknown_devices: Some(settings.allow_unknown_devices),
            auto_create_devices: Some(settings.auto_create_devices),
            allow_unknown_zones: Some(settings.allow_unknown_zones),
            auto_create_zones: Some(settings.auto_create_zones),
        })
        .await
        .unwrap();
    engine
}

fn zone_policy(allow: bool, auto: bool) -> NetifySettings {
    NetifySettings {
        allow_unknown_devices: true,
        auto_create_devices: true,
        allow_unknown_zones: allow,
        auto_create_zones: auto,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Expect {
    Reject,
    Default,
    Create,
}

async fn zone_outcome(settings: NetifySettings, ip: &str) -> Expect {
    let engine = engine_with(settings).await;
    match engine
        .ingest(&TelemetryRecord::new(ip, "aa:bb:cc:00:00:01"))
        .await
    {
        Err(CoreError::UnknownZoneRejected { .. }) => Expect::Reject,
        Ok(outcome) => match outcome.zone {
            ZoneDecision::DefaultFallback { zone } => {
                assert!(zone.is_default());
                Expect::Default
            }
            ZoneDecision::Created { zone } => {
                assert_eq!(zone.router_identifier, UNSEEN_ZONE);
                Expect::Create
            }
            ZoneDecision::Existing { zone } => panic!("unexpected existing zone {zone:?}"),
        },
        Err(e) => panic!("unexpected error {e}"),
    }
}

// ── Policy truth table ──────────────────────────────────────────────

#[tokio::test]
async fn test_zone_policy_truth_table() {
    // (allow_unknown_zones, auto_create_zones, identifier resolves?, expected)
    let table = [
        (false, false, true, Expect::Reject),
        (false, true, true, Expect::Reject),
        (true, false, true, Expect::Default),
        (true, true, true, Expect::Create),
        (false, false, false, Expect::Reject),
        (false, true, false, Expect::Reject),
        (true, false, false, Expect::Default),
        (true, true, false, Expect::Default),
    ];

    for (allow, auto, resolves, expected) in table {
        let ip = if resolves { MAPPED_IP } else { UNMAPPED_IP };
        let actual = zone_outcome(zone_policy(allow, auto), ip).await;
        assert_eq!(
            actual, expected,
            "allow={allow} auto={auto} resolves={resolves}"
        );
    }
}

#[tokio::test]
async fn test_dry_run_matches_provisioner() {
    for allow in [false, true] {
        for auto in [false, true] {
            for ip in [MAPPED_IP, UNMAPPED_IP] {
                let engine = engine_with(zone_policy(allow, auto)).await;
                let report = engine.test(&IdentityQuery::new(ip)).await.unwrap();
                let zones_before = engine.zones().await.unwrap();

                let live = engine
                    .ingest(&TelemetryRecord::new(ip, "aa:bb:cc:00:00:02"))
                    .await;
                match (&report.zone_preview, live) {
                    (ZonePreview::Rejected { .. }, Err(CoreError::UnknownZoneRejected { .. })) => {}
                    (ZonePreview::DefaultFallback { zone_id }, Ok(outcome)) => {
                        assert!(matches!(outcome.zone, ZoneDecision::DefaultFallback { .. }));
                        assert_eq!(outcome.zone.zone().id, *zone_id);
                    }
                    (ZonePreview::WouldCreate { router_identifier }, Ok(outcome)) => {
                        assert!(matches!(outcome.zone, ZoneDecision::Created { .. }));
                        assert_eq!(&outcome.zone.zone().router_identifier, router_identifier);
                        assert_eq!(zones_before.len(), 1);
                    }
                    (preview, live) => panic!("preview {preview:?} disagrees with {live:?}"),
                }
            }
        }
    }
}

// ── Idempotence ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_duplicate_delivery_creates_one_device() {
    let engine = engine_with(zone_policy(true, true)).await;
    let record = TelemetryRecord::new(MAPPED_IP, "aa:bb:cc:dd:ee:01");

    let first = engine.ingest(&record).await.unwrap();
    let second = engine.ingest(&record).await.unwrap();

    assert!(matches!(first.device, DeviceDecision::Created { .. }));
    assert!(matches!(
        second.device,
        DeviceDecision::Existing {
            resolved_zone_ignored: false,
            ..
        }
    ));
    assert!(matches!(second.zone, ZoneDecision::Existing { .. }));
    assert_eq!(first.device_id, second.device_id);
    assert_eq!(engine.devices(DeviceFilter::ALL).await.unwrap().len(), 1);
    assert_eq!(engine.zones().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_sightings_create_one_zone_and_device() {
    let engine = engine_with(zone_policy(true, true)).await;
    let record = Arc::new(TelemetryRecord::new(MAPPED_IP, "aa:bb:cc:dd:ee:02"));

    let mut handles = Vec::new();
    for _ in 0..32 {
        let engine = engine.clone();
        let record = Arc::clone(&record);
        handles.push(tokio::spawn(async move { engine.ingest(&record).await }));
    }
    let mut device_ids = Vec::new();
    for handle in handles {
        device_ids.push(handle.await.unwrap().unwrap().device_id);
    }

    device_ids.dedup();
    assert_eq!(device_ids.len(), 1);
    assert_eq!(engine.zones().await.unwrap().len(), 2);
    assert_eq!(engine.devices(DeviceFilter::ALL).await.unwrap().len(), 1);
}

// ── Device policy ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_device_left_unassigned() {
    let engine = engine_with(NetifySettings {
        allow_unknown_devices: true,
        auto_create_devices: false,
        allow_unknown_zones: false,
        auto_create_zones: false,
    })
    .await;
    let known = engine
        .create_zone(netzone_core::NewZone::auto_created(UNSEEN_ZONE))
        .await
        .unwrap();
    let before = engine.stats().await.unwrap();

    let outcome = engine
        .ingest(&TelemetryRecord::new(MAPPED_IP, "AA:BB:CC:DD:EE:FF"))
        .await
        .unwrap();

    assert!(matches!(outcome.zone, ZoneDecision::Existing { .. }));
    assert!(matches!(outcome.device, DeviceDecision::Unassigned { .. }));
    assert_eq!(outcome.router_zone_id, None);

    let after = engine.stats().await.unwrap();
    assert_eq!(after.unassigned_devices, before.unassigned_devices + 1);
    assert_eq!(
        after.zone(known.id).unwrap().device_count,
        before.zone(known.id).unwrap().device_count
    );
}

#[tokio::test]
async fn test_unknown_device_rejected_by_default() {
    let engine = engine_with(NetifySettings {
        allow_unknown_zones: true,
        ..NetifySettings::default()
    })
    .await;
    let err = engine
        .ingest(&TelemetryRecord::new(UNMAPPED_IP, "aa:bb:cc:dd:ee:03"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnknownDeviceRejected { .. }));
    assert!(engine.devices(DeviceFilter::ALL).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_assignment_is_the_only_way_to_move_a_device() {
    let engine = engine_with(zone_policy(true, true)).await;
    let record = TelemetryRecord::new(MAPPED_IP, "aa:bb:cc:dd:ee:04");
    let first = engine.ingest(&record).await.unwrap();

    engine
        .assign_device(first.device_id, Some(ZoneId(1)))
        .await
        .unwrap();
    let again = engine.ingest(&record).await.unwrap();

    assert_eq!(again.router_zone_id, Some(ZoneId(1)));
    assert!(matches!(
        again.device,
        DeviceDecision::Existing {
            resolved_zone_ignored: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_deleting_zone_reassigns_devices_to_default() {
    let engine = engine_with(zone_policy(true, true)).await;
    let outcome = engine
        .ingest(&TelemetryRecord::new(MAPPED_IP, "aa:bb:cc:dd:ee:05"))
        .await
        .unwrap();
    let zone_id = outcome.router_zone_id.unwrap();

    assert_eq!(engine.delete_zone(zone_id).await.unwrap(), 1);
    let device = engine.device(outcome.device_id).await.unwrap();
    assert_eq!(device.router_zone_id, Some(ZoneId(1)));
    assert_eq!(engine.stats().await.unwrap().total_routers, 1);
}

// ── Mapping visibility ──────────────────────────────────────────────

#[tokio::test]
async fn test_add_is_visible_to_next_test_call() {
    let engine = Engine::in_memory();
    let query = IdentityQuery::new("192.168.1.1");
    assert_eq!(
        engine.test(&query).await.unwrap().resolved_zone_identifier,
        None
    );

    engine
        .add_mapping(
            MappingType::RouterIdentifierMapping,
            "192.168.1.1",
            "router_office_001",
        )
        .await
        .unwrap();
    let report = engine.test(&query).await.unwrap();

    assert_eq!(
        serde_json::to_value(&report.resolution).unwrap(),
        serde_json::json!({
            "ip": "192.168.1.1",
            "router_identifier_mapping": "router_office_001",
            "router_mapping": null,
            "interface_mapping": null
        })
    );

    engine
        .remove_mapping(MappingType::RouterIdentifierMapping, "192.168.1.1")
        .await
        .unwrap();
    assert_eq!(
        engine.resolve(&query).unwrap().resolved_zone_identifier,
        None
    );
}

#[tokio::test]
async fn test_dry_run_never_mutates() {
    let engine = engine_with(zone_policy(true, true)).await;
    for _ in 0..3 {
        engine.test(&IdentityQuery::new(MAPPED_IP)).await.unwrap();
    }
    assert_eq!(engine.zones().await.unwrap().len(), 1);
    assert!(engine.devices(DeviceFilter::ALL).await.unwrap().is_empty());
}

// ── Pipeline ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pipeline_survives_rejections() {
    let engine = engine_with(NetifySettings::default()).await;
    engine
        .create_zone(netzone_core::NewZone::auto_created(UNSEEN_ZONE))
        .await
        .unwrap();
    let pipeline = IngestPipeline::spawn(engine.clone(), 3, 8, CancellationToken::new());

    pipeline
        .submit(TelemetryRecord::new(UNMAPPED_IP, "aa:00:00:00:00:01"))
        .await
        .unwrap();
    pipeline
        .submit(TelemetryRecord::new(MAPPED_IP, "aa:00:00:00:00:02"))
        .await
        .unwrap();
    pipeline
        .submit(TelemetryRecord::new("300.1.1.1", "aa:00:00:00:00:03"))
        .await
        .unwrap();

    let stats = pipeline.shutdown().await;
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.invalid, 1);
    assert_eq!(stats.rejected_zone, 1);
    assert_eq!(stats.rejected_device, 1);
    assert_eq!(stats.accepted, 0);
}
