// ── Engine facade ──
//
// Owns the mapping store and the inventory collaborator and exposes every
// operation the HTTP server and CLI need. Cheap to clone.

use std::sync::Arc;

use tracing::info;

use crate::error::CoreError;
use crate::harness::{TestReport, preview};
use crate::ingest::TelemetryRecord;
use crate::model::{
    DEFAULT_ZONE_IDENTIFIER, Device, DeviceId, DeviceIdentifier, DeviceStats, DeviceUpdate,
    IdentityQuery, MappingConfig, MappingType, NetifySettings, NewDevice, NewZone, PolicyPatch,
    ResolutionResult, RouterZone, ZoneId, ZoneUpdate,
};
use crate::provisioner::{ProvisionOutcome, provision};
use crate::resolver::resolve;
use crate::store::{Inventory, MappingStore, MemoryInventory};

/// The zone side of a [`DeviceFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZoneScope {
    #[default]
    Any,
    Zone(ZoneId),
    Unassigned,
}

/// Which devices [`Engine::devices`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub zone: ZoneScope,
    pub active_only: bool,
}

impl DeviceFilter {
    pub const ALL: Self = Self {
        zone: ZoneScope::Any,
        active_only: false,
    };

    pub fn zone(id: ZoneId) -> Self {
        Self {
            zone: ZoneScope::Zone(id),
            ..Self::ALL
        }
    }

    pub fn unassigned() -> Self {
        Self {
            zone: ZoneScope::Unassigned,
            ..Self::ALL
        }
    }

    #[must_use]
    pub fn active(self) -> Self {
        Self {
            active_only: true,
            ..self
        }
    }

    fn matches(self, device: &Device) -> bool {
        let in_scope = match self.zone {
            ZoneScope::Any => true,
            ZoneScope::Zone(zone) => device.router_zone_id == Some(zone),
            ZoneScope::Unassigned => device.is_unassigned(),
        };
        in_scope && (device.is_active || !self.active_only)
    }
}

/// Resolution and provisioning engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: Arc<MappingStore>,
    inventory: Arc<dyn Inventory>,
}

impl Engine {
    pub fn new(store: Arc<MappingStore>, inventory: Arc<dyn Inventory>) -> Self {
        Self {
            inner: Arc::new(EngineInner { store, inventory }),
        }
    }

    /// Empty mappings, default policy, fresh in-memory inventory.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MappingStore::in_memory()),
            Arc::new(MemoryInventory::new()),
        )
    }

    pub fn store(&self) -> &Arc<MappingStore> {
        &self.inner.store
    }

    pub fn inventory(&self) -> &Arc<dyn Inventory> {
        &self.inner.inventory
    }

    // ── Mapping configuration ────────────────────────────────────────

    pub fn config(&self) -> Arc<MappingConfig> {
        self.inner.store.snapshot()
    }

    pub async fn add_mapping(
        &self,
        kind: MappingType,
        key: &str,
        value: &str,
    ) -> Result<Option<String>, CoreError> {
        self.inner.store.add(kind, key, value).await
    }

    pub async fn remove_mapping(&self, kind: MappingType, key: &str) -> Result<String, CoreError> {
        self.inner.store.remove(kind, key).await
    }

    pub async fn update_policy(&self, patch: &PolicyPatch) -> Result<NetifySettings, CoreError> {
        self.inner.store.update_policy(patch).await
    }

    // ── Resolution ───────────────────────────────────────────────────

    pub fn resolve(&self, query: &IdentityQuery) -> Result<ResolutionResult, CoreError> {
        resolve(&self.config(), query)
    }

    /// Dry run: resolve and preview the zone step. Never mutates.
    pub async fn test(&self, query: &IdentityQuery) -> Result<TestReport, CoreError> {
        let config = self.config();
        let resolution = resolve(&config, query)?;
        preview(self.inner.inventory.as_ref(), &config, resolution).await
    }

    /// Resolve and provision one telemetry record.
    ///
    /// Mappings and policy come from the same snapshot.
    pub async fn ingest(&self, record: &TelemetryRecord) -> Result<ProvisionOutcome, CoreError> {
        let device = device_identifier(&record.device_identifier)?;
        let config = self.config();
        let resolution = resolve(&config, &record.query())?;
        provision(
            self.inner.inventory.as_ref(),
            config.netify_settings,
            &resolution,
            &device,
        )
        .await
    }

    // ── Zones ────────────────────────────────────────────────────────

    pub async fn zones(&self) -> Result<Vec<RouterZone>, CoreError> {
        self.inner.inventory.zones().await
    }

    pub async fn zone(&self, id: ZoneId) -> Result<RouterZone, CoreError> {
        self.inner
            .inventory
            .zone_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ZoneNotFound {
                identifier: id.to_string(),
            })
    }

    pub async fn create_zone(&self, mut zone: NewZone) -> Result<RouterZone, CoreError> {
        zone.router_identifier = required("router_identifier", &zone.router_identifier)?;
        zone.zone_name = required("zone_name", &zone.zone_name)?;
        let zone = self.inner.inventory.insert_zone(zone).await?;
        info!(zone = %zone.router_identifier, id = %zone.id, "router zone created");
        Ok(zone)
    }

    /// The default zone keeps its identifier.
    pub async fn update_zone(
        &self,
        id: ZoneId,
        update: &ZoneUpdate,
    ) -> Result<RouterZone, CoreError> {
        let current = self.zone(id).await?;
        let mut update = update.clone();
        if let Some(identifier) = update.router_identifier.take() {
            let identifier = required("router_identifier", &identifier)?;
            if current.is_default() && identifier != DEFAULT_ZONE_IDENTIFIER {
                return Err(CoreError::ProtectedZone {
                    identifier: current.router_identifier,
                    reason: "the default zone's identifier cannot change".into(),
                });
            }
            update.router_identifier = Some(identifier);
        }
        if let Some(name) = update.zone_name.take() {
            update.zone_name = Some(required("zone_name", &name)?);
        }
        self.inner.inventory.update_zone(id, &update).await
    }

    /// Delete a zone; its devices move to the default zone.
    pub async fn delete_zone(&self, id: ZoneId) -> Result<usize, CoreError> {
        let zone = self.zone(id).await?;
        if zone.is_default() {
            return Err(CoreError::ProtectedZone {
                identifier: zone.router_identifier,
                reason: "the default zone cannot be deleted".into(),
            });
        }
        self.inner.inventory.delete_zone(id).await
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn devices(&self, filter: DeviceFilter) -> Result<Vec<Device>, CoreError> {
        let mut devices = self.inner.inventory.devices().await?;
        devices.retain(|d| filter.matches(d));
        Ok(devices)
    }

    pub async fn device(&self, id: DeviceId) -> Result<Device, CoreError> {
        self.inner
            .inventory
            .device_by_id(id)
            .await?
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: id.to_string(),
            })
    }

    pub async fn create_device(&self, mut device: NewDevice) -> Result<Device, CoreError> {
        device.device_identifier = device_identifier(device.device_identifier.as_str())?;
        device.device_name = required("device_name", &device.device_name)?;
        let device = self.inner.inventory.insert_device(device).await?;
        info!(device = %device.device_identifier, id = %device.id, "device registered");
        Ok(device)
    }

    /// Move a device to a zone, or back to unassigned with `None`.
    pub async fn assign_device(
        &self,
        id: DeviceId,
        zone: Option<ZoneId>,
    ) -> Result<Device, CoreError> {
        let device = self.inner.inventory.assign_device(id, zone).await?;
        info!(device = %device.device_identifier, zone = ?zone, "device assigned");
        Ok(device)
    }

    /// Edit a device. A `router_zone_id` in the update is applied through
    /// [`assign_device`](Self::assign_device).
    pub async fn update_device(
        &self,
        id: DeviceId,
        update: &DeviceUpdate,
    ) -> Result<Device, CoreError> {
        let mut update = update.clone();
        let zone = update.router_zone_id.take();
        if let Some(name) = update.device_name.take() {
            update.device_name = Some(required("device_name", &name)?);
        }
        if let Some(identifier) = update.device_identifier.take() {
            update.device_identifier = Some(device_identifier(identifier.as_str())?);
        }
        if let Some(Some(zone)) = zone {
            self.zone(zone).await?;
        }

        let mut device = self.inner.inventory.update_device(id, &update).await?;
        if let Some(zone) = zone.filter(|z| *z != device.router_zone_id) {
            device = self.assign_device(id, zone).await?;
        }
        info!(device = %device.device_identifier, id = %device.id, "device updated");
        Ok(device)
    }

    pub async fn delete_device(&self, id: DeviceId) -> Result<Device, CoreError> {
        let device = self.inner.inventory.delete_device(id).await?;
        info!(device = %device.device_identifier, id = %device.id, "device deleted");
        Ok(device)
    }

    pub async fn stats(&self) -> Result<DeviceStats, CoreError> {
        let zones = self.inner.inventory.zones().await?;
        let devices = self.inner.inventory.devices().await?;
        Ok(DeviceStats::compute(&zones, &devices))
    }
}

fn device_identifier(raw: &str) -> Result<DeviceIdentifier, CoreError> {
    let identifier = DeviceIdentifier::new(raw);
    if identifier.is_empty() {
        return Err(CoreError::InvalidKey {
            kind: "device_identifier".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(identifier)
}

fn required(field: &str, value: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::InvalidValue {
            kind: field.to_owned(),
            reason: "must not be empty".into(),
        });
    }
    Ok(value.to_owned())
}
