// ── Provisioner ──
//
// Turns a resolution plus a device identifier into concrete zone and
// device rows. Every creation is insert-unique against the inventory;
// a `Conflict` means another worker won the race, so the row is
// re-fetched and used.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{
    Device, DeviceId, DeviceIdentifier, NetifySettings, NewDevice, NewZone, PolicyOutcome,
    ResolutionResult, RouterZone, ZoneId,
};
use crate::store::Inventory;

// ── Zone planning ────────────────────────────────────────────────────

/// What the zone step will do, before anything is written.
///
/// Shared by [`provision`] and the dry-run harness so both always agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ZonePlan {
    UseExisting(RouterZone),
    Create(String),
    FallbackToDefault,
    Reject,
}

pub(crate) fn plan_zone(
    existing: Option<RouterZone>,
    identifier: Option<&str>,
    policy: PolicyOutcome,
) -> ZonePlan {
    if let Some(zone) = existing {
        return ZonePlan::UseExisting(zone);
    }
    match (policy, identifier) {
        (PolicyOutcome::Reject, _) => ZonePlan::Reject,
        (PolicyOutcome::AutoCreate, Some(identifier)) => ZonePlan::Create(identifier.to_owned()),
        // Nothing to name a zone after without an identifier.
        (PolicyOutcome::AutoCreate, None) | (PolicyOutcome::FallbackToDefault, _) => {
            ZonePlan::FallbackToDefault
        }
    }
}

/// Look up the resolved zone and plan the zone step. Read-only.
pub(crate) async fn lookup_and_plan(
    inventory: &dyn Inventory,
    policy: NetifySettings,
    resolution: &ResolutionResult,
) -> Result<ZonePlan, CoreError> {
    let identifier = resolution.resolved_zone_identifier.as_deref();
    let existing = match identifier {
        Some(identifier) => inventory.zone_by_identifier(identifier).await?,
        None => None,
    };
    Ok(plan_zone(existing, identifier, policy.zone_policy()))
}

// ── Outcomes ─────────────────────────────────────────────────────────

/// How the zone for a record was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ZoneDecision {
    Existing { zone: RouterZone },
    Created { zone: RouterZone },
    DefaultFallback { zone: RouterZone },
}

impl ZoneDecision {
    pub fn zone(&self) -> &RouterZone {
        match self {
            Self::Existing { zone } | Self::Created { zone } | Self::DefaultFallback { zone } => {
                zone
            }
        }
    }
}

/// How the device for a record was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DeviceDecision {
    /// Known device. It keeps its own zone; `resolved_zone_ignored` is set
    /// when the record resolved somewhere else.
    Existing {
        device: Device,
        resolved_zone_ignored: bool,
    },
    Created {
        device: Device,
    },
    /// Accepted, but waiting for manual zone assignment.
    Unassigned {
        device: Device,
    },
}

impl DeviceDecision {
    pub fn device(&self) -> &Device {
        match self {
            Self::Existing { device, .. } | Self::Created { device } | Self::Unassigned { device } => {
                device
            }
        }
    }
}

/// Result of provisioning one telemetry record.
///
/// `router_zone_id` and `device_id` are what the flow store tags the
/// record with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    pub zone: ZoneDecision,
    pub device: DeviceDecision,
    pub router_zone_id: Option<ZoneId>,
    pub device_id: DeviceId,
}

// ── Provisioning ─────────────────────────────────────────────────────

/// Apply `policy` to a resolution and a device identifier.
///
/// Fails with [`CoreError::UnknownZoneRejected`] or
/// [`CoreError::UnknownDeviceRejected`] when policy drops the record. A
/// zone created before a device rejection is kept.
pub async fn provision(
    inventory: &dyn Inventory,
    policy: NetifySettings,
    resolution: &ResolutionResult,
    device_identifier: &DeviceIdentifier,
) -> Result<ProvisionOutcome, CoreError> {
    let mut zone = decide_zone(inventory, policy, resolution).await?;

    let device = match inventory.device_by_identifier(device_identifier).await? {
        Some(device) => existing_device(device, zone.zone().id),
        None => match policy.device_policy() {
            PolicyOutcome::Reject => {
                return Err(CoreError::UnknownDeviceRejected {
                    identifier: device_identifier.to_string(),
                });
            }
            PolicyOutcome::AutoCreate => {
                match create_device(inventory, device_identifier, Some(zone.zone().id)).await {
                    // The zone was deleted after it was looked up; plan again once.
                    Err(CoreError::ZoneNotFound { .. }) => {
                        debug!(
                            zone = %zone.zone().router_identifier,
                            "router zone removed during provisioning, re-planning"
                        );
                        zone = decide_zone(inventory, policy, resolution).await?;
                        create_device(inventory, device_identifier, Some(zone.zone().id)).await?
                    }
                    created => created?,
                }
            }
            PolicyOutcome::FallbackToDefault => {
                create_device(inventory, device_identifier, None).await?
            }
        },
    };

    let tagged = device.device();
    Ok(ProvisionOutcome {
        router_zone_id: tagged.router_zone_id,
        device_id: tagged.id,
        zone,
        device,
    })
}

async fn decide_zone(
    inventory: &dyn Inventory,
    policy: NetifySettings,
    resolution: &ResolutionResult,
) -> Result<ZoneDecision, CoreError> {
    match lookup_and_plan(inventory, policy, resolution).await? {
        ZonePlan::UseExisting(zone) => Ok(ZoneDecision::Existing { zone }),
        ZonePlan::Create(identifier) => create_zone(inventory, &identifier).await,
        ZonePlan::FallbackToDefault => Ok(ZoneDecision::DefaultFallback {
            zone: inventory.default_zone().await?,
        }),
        ZonePlan::Reject => Err(CoreError::UnknownZoneRejected {
            identifier: resolution.resolved_zone_identifier.clone(),
        }),
    }
}

fn existing_device(device: Device, resolved: ZoneId) -> DeviceDecision {
    let resolved_zone_ignored = device.router_zone_id != Some(resolved);
    if resolved_zone_ignored {
        debug!(
            device = %device.device_identifier,
            current = ?device.router_zone_id,
            %resolved,
            "known device keeps its zone"
        );
    }
    DeviceDecision::Existing {
        device,
        resolved_zone_ignored,
    }
}

async fn create_zone(inventory: &dyn Inventory, identifier: &str) -> Result<ZoneDecision, CoreError> {
    match inventory.insert_zone(NewZone::auto_created(identifier)).await {
        Ok(zone) => {
            info!(zone = %zone.router_identifier, id = %zone.id, "router zone auto-created");
            Ok(ZoneDecision::Created { zone })
        }
        Err(CoreError::Conflict { .. }) => {
            debug!(zone = identifier, "router zone created concurrently, re-fetching");
            let zone = inventory
                .zone_by_identifier(identifier)
                .await?
                .ok_or_else(|| CoreError::ZoneNotFound {
                    identifier: identifier.to_owned(),
                })?;
            Ok(ZoneDecision::Existing { zone })
        }
        Err(e) => Err(e),
    }
}

async fn create_device(
    inventory: &dyn Inventory,
    identifier: &DeviceIdentifier,
    zone: Option<ZoneId>,
) -> Result<DeviceDecision, CoreError> {
    match inventory
        .insert_device(NewDevice::discovered(identifier, zone))
        .await
    {
        Ok(device) => {
            info!(
                device = %device.device_identifier,
                zone = ?device.router_zone_id,
                "device auto-registered"
            );
            Ok(match zone {
                Some(_) => DeviceDecision::Created { device },
                None => DeviceDecision::Unassigned { device },
            })
        }
        Err(CoreError::Conflict { .. }) => {
            debug!(device = %identifier, "device created concurrently, re-fetching");
            let device = inventory
                .device_by_identifier(identifier)
                .await?
                .ok_or_else(|| CoreError::DeviceNotFound {
                    identifier: identifier.to_string(),
                })?;
            Ok(match zone {
                Some(zone) => existing_device(device, zone),
                None => DeviceDecision::Existing {
                    device,
                    resolved_zone_ignored: false,
                },
            })
        }
        Err(e) => Err(e),
    }
}
