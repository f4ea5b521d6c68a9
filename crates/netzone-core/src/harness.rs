// ── Dry-run harness ──
//
// "What would happen to a record from this IP" without touching the
// inventory. The zone preview runs the same planning step as the
// provisioner, so the answer matches what live traffic would get.

use serde::Serialize;

use crate::error::CoreError;
use crate::model::{MappingConfig, ResolutionResult, ZoneId};
use crate::provisioner::{ZonePlan, lookup_and_plan};
use crate::store::Inventory;

/// The zone a record would land in under the current policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ZonePreview {
    Existing {
        zone_id: ZoneId,
        router_identifier: String,
        zone_name: String,
    },
    WouldCreate {
        router_identifier: String,
    },
    DefaultFallback {
        zone_id: ZoneId,
    },
    Rejected {
        router_identifier: Option<String>,
    },
}

/// Body of the mapping test endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestReport {
    #[serde(rename = "test_result")]
    pub resolution: ResolutionResult,
    pub resolved_zone_identifier: Option<String>,
    pub zone_preview: ZonePreview,
}

/// Preview the zone step for an already-resolved record.
pub async fn preview(
    inventory: &dyn Inventory,
    config: &MappingConfig,
    resolution: ResolutionResult,
) -> Result<TestReport, CoreError> {
    let zone_preview = match lookup_and_plan(inventory, config.netify_settings, &resolution).await? {
        ZonePlan::UseExisting(zone) => ZonePreview::Existing {
            zone_id: zone.id,
            router_identifier: zone.router_identifier,
            zone_name: zone.zone_name,
        },
        ZonePlan::Create(router_identifier) => ZonePreview::WouldCreate { router_identifier },
        ZonePlan::FallbackToDefault => ZonePreview::DefaultFallback {
            zone_id: inventory.default_zone().await?.id,
        },
        ZonePlan::Reject => ZonePreview::Rejected {
            router_identifier: resolution.resolved_zone_identifier.clone(),
        },
    };
    Ok(TestReport {
        resolved_zone_identifier: resolution.resolved_zone_identifier.clone(),
        resolution,
        zone_preview,
    })
}
