// ── Zone / device inventory ──
//
// The persistence collaborator for router zones and devices. The engine
// only talks to the `Inventory` trait; `MemoryInventory` is the in-process
// implementation used by the server and the tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::collection::EntityCollection;
use crate::error::CoreError;
use crate::model::{
    DEFAULT_ZONE_IDENTIFIER, Device, DeviceId, DeviceIdentifier, DeviceUpdate, NewDevice, NewZone,
    RouterZone, ZoneId, ZoneUpdate,
};

/// Repository-style access to router zones and devices.
///
/// `insert_zone` / `insert_device` must fail with [`CoreError::Conflict`]
/// when the natural identifier is taken; callers rely on that to turn
/// concurrent creation into re-fetch-and-use.
#[async_trait]
pub trait Inventory: Send + Sync {
    // ── Zones ────────────────────────────────────────────────────────
    async fn zone_by_identifier(&self, router_identifier: &str)
    -> Result<Option<RouterZone>, CoreError>;

    async fn zone_by_id(&self, id: ZoneId) -> Result<Option<RouterZone>, CoreError>;

    /// The zone with identifier [`DEFAULT_ZONE_IDENTIFIER`].
    async fn default_zone(&self) -> Result<RouterZone, CoreError>;

    async fn insert_zone(&self, zone: NewZone) -> Result<RouterZone, CoreError>;

    async fn update_zone(&self, id: ZoneId, update: &ZoneUpdate) -> Result<RouterZone, CoreError>;

    /// Delete a zone, moving its devices to the default zone in the same
    /// operation. Returns how many devices were moved.
    async fn delete_zone(&self, id: ZoneId) -> Result<usize, CoreError>;

    async fn zones(&self) -> Result<Vec<RouterZone>, CoreError>;

    // ── Devices ──────────────────────────────────────────────────────
    async fn device_by_identifier(
        &self,
        identifier: &DeviceIdentifier,
    ) -> Result<Option<Device>, CoreError>;

    async fn device_by_id(&self, id: DeviceId) -> Result<Option<Device>, CoreError>;

    async fn insert_device(&self, device: NewDevice) -> Result<Device, CoreError>;

    /// Move a device to a zone, or to no zone with `None`.
    async fn assign_device(&self, id: DeviceId, zone: Option<ZoneId>)
    -> Result<Device, CoreError>;

    /// Edit a device's descriptive fields and identifier. The zone is left
    /// alone; that goes through [`assign_device`](Self::assign_device).
    async fn update_device(&self, id: DeviceId, update: &DeviceUpdate)
    -> Result<Device, CoreError>;

    /// Remove a device, returning it.
    async fn delete_device(&self, id: DeviceId) -> Result<Device, CoreError>;

    async fn devices(&self) -> Result<Vec<Device>, CoreError>;
}

// ── In-memory implementation ─────────────────────────────────────────

/// `DashMap`-backed inventory, seeded with the default zone.
pub struct MemoryInventory {
    zones: EntityCollection<RouterZone>,
    devices: EntityCollection<Device>,
    next_zone_id: AtomicI64,
    next_device_id: AtomicI64,
    /// Zone deletion takes this exclusively so no device can be inserted
    /// into (or moved to) a zone that is being removed.
    zone_lifecycle: RwLock<()>,
    /// Serializes read-modify-write of existing device rows.
    device_writes: Mutex<()>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        let inventory = Self {
            zones: EntityCollection::new(),
            devices: EntityCollection::new(),
            next_zone_id: AtomicI64::new(1),
            next_device_id: AtomicI64::new(1),
            zone_lifecycle: RwLock::new(()),
            device_writes: Mutex::new(()),
        };
        let default = inventory.build_zone(NewZone::default_zone());
        let seeded = inventory.zones.insert_new(
            default.router_identifier.clone(),
            default.id.0,
            default,
        );
        debug_assert!(seeded.is_ok(), "default zone seeded into a non-empty collection");
        inventory
    }

    fn build_zone(&self, zone: NewZone) -> RouterZone {
        RouterZone {
            id: ZoneId(self.next_zone_id.fetch_add(1, Ordering::Relaxed)),
            router_identifier: zone.router_identifier,
            zone_name: zone.zone_name,
            router_name: zone.router_name,
            description: zone.description,
            is_active: zone.is_active,
            created_at: Utc::now(),
        }
    }

    fn require_zone(&self, id: ZoneId) -> Result<Arc<RouterZone>, CoreError> {
        self.zones.get_by_id(id.0).ok_or_else(|| CoreError::ZoneNotFound {
            identifier: id.to_string(),
        })
    }

    fn require_device(&self, id: DeviceId) -> Result<Arc<Device>, CoreError> {
        self.devices
            .get_by_id(id.0)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: id.to_string(),
            })
    }

    fn store_device(&self, device: Device) {
        let key = device.device_identifier.as_str().to_owned();
        self.devices.replace(&key, device);
    }
}

impl Default for MemoryInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn zone_by_identifier(
        &self,
        router_identifier: &str,
    ) -> Result<Option<RouterZone>, CoreError> {
        Ok(self
            .zones
            .get_by_key(router_identifier)
            .map(|z| RouterZone::clone(&z)))
    }

    async fn zone_by_id(&self, id: ZoneId) -> Result<Option<RouterZone>, CoreError> {
        Ok(self.zones.get_by_id(id.0).map(|z| RouterZone::clone(&z)))
    }

    async fn default_zone(&self) -> Result<RouterZone, CoreError> {
        self.zones
            .get_by_key(DEFAULT_ZONE_IDENTIFIER)
            .map(|z| RouterZone::clone(&z))
            .ok_or_else(|| CoreError::Internal("default router zone is missing".into()))
    }

    async fn insert_zone(&self, zone: NewZone) -> Result<RouterZone, CoreError> {
        let zone = self.build_zone(zone);
        let key = zone.router_identifier.clone();
        match self.zones.insert_new(key.clone(), zone.id.0, zone) {
            Ok(stored) => Ok(RouterZone::clone(&stored)),
            Err(_) => Err(CoreError::Conflict {
                entity_type: "Router zone".into(),
                identifier: key,
            }),
        }
    }

    async fn update_zone(&self, id: ZoneId, update: &ZoneUpdate) -> Result<RouterZone, CoreError> {
        let _lifecycle = self.zone_lifecycle.write().await;
        let current = self.require_zone(id)?;
        let mut next = RouterZone::clone(&current);
        update.apply(&mut next);

        if next.router_identifier == current.router_identifier {
            self.zones.replace(&current.router_identifier, next.clone());
        } else {
            let new_key = next.router_identifier.clone();
            if self.zones.insert_new(new_key.clone(), id.0, next.clone()).is_err() {
                return Err(CoreError::Conflict {
                    entity_type: "Router zone".into(),
                    identifier: new_key,
                });
            }
            self.zones.remove(&current.router_identifier);
        }
        Ok(next)
    }

    async fn delete_zone(&self, id: ZoneId) -> Result<usize, CoreError> {
        let _lifecycle = self.zone_lifecycle.write().await;
        let zone = self.require_zone(id)?;
        let fallback = self.default_zone().await?;

        let mut moved = 0;
        for device in self.devices.values() {
            if device.router_zone_id == Some(id) {
                let mut next = Device::clone(&device);
                next.router_zone_id = Some(fallback.id);
                self.store_device(next);
                moved += 1;
            }
        }
        self.zones.remove(&zone.router_identifier);
        info!(
            zone = %zone.router_identifier,
            moved,
            "router zone deleted, devices reassigned to default zone"
        );
        Ok(moved)
    }

    async fn zones(&self) -> Result<Vec<RouterZone>, CoreError> {
        let mut zones: Vec<RouterZone> = self
            .zones
            .values()
            .iter()
            .map(|z| RouterZone::clone(z))
            .collect();
        zones.sort_by_key(|z| z.id);
        Ok(zones)
    }

    async fn device_by_identifier(
        &self,
        identifier: &DeviceIdentifier,
    ) -> Result<Option<Device>, CoreError> {
        Ok(self
            .devices
            .get_by_key(identifier.as_str())
            .map(|d| Device::clone(&d)))
    }

    async fn device_by_id(&self, id: DeviceId) -> Result<Option<Device>, CoreError> {
        Ok(self.devices.get_by_id(id.0).map(|d| Device::clone(&d)))
    }

    async fn insert_device(&self, device: NewDevice) -> Result<Device, CoreError> {
        let _lifecycle = self.zone_lifecycle.read().await;
        if let Some(zone) = device.router_zone_id {
            self.require_zone(zone)?;
        }

        let device = Device {
            id: DeviceId(self.next_device_id.fetch_add(1, Ordering::Relaxed)),
            device_identifier: device.device_identifier,
            device_name: device.device_name,
            device_type: device.device_type,
            description: device.description,
            is_active: device.is_active,
            router_zone_id: device.router_zone_id,
            created_at: Utc::now(),
        };
        let key = device.device_identifier.as_str().to_owned();
        match self.devices.insert_new(key.clone(), device.id.0, device) {
            Ok(stored) => Ok(Device::clone(&stored)),
            Err(_) => Err(CoreError::Conflict {
                entity_type: "Device".into(),
                identifier: key,
            }),
        }
    }

    async fn assign_device(
        &self,
        id: DeviceId,
        zone: Option<ZoneId>,
    ) -> Result<Device, CoreError> {
        let _lifecycle = self.zone_lifecycle.read().await;
        let _writes = self.device_writes.lock().await;
        if let Some(zone) = zone {
            self.require_zone(zone)?;
        }
        let current = self.require_device(id)?;
        let mut device = Device::clone(&current);
        device.router_zone_id = zone;
        self.store_device(device.clone());
        Ok(device)
    }

    async fn update_device(
        &self,
        id: DeviceId,
        update: &DeviceUpdate,
    ) -> Result<Device, CoreError> {
        let _lifecycle = self.zone_lifecycle.read().await;
        let _writes = self.device_writes.lock().await;
        let current = self.require_device(id)?;
        let mut next = Device::clone(&current);
        update.apply(&mut next);

        if next.device_identifier == current.device_identifier {
            self.store_device(next.clone());
        } else {
            let new_key = next.device_identifier.as_str().to_owned();
            if self.devices.insert_new(new_key.clone(), id.0, next.clone()).is_err() {
                return Err(CoreError::Conflict {
                    entity_type: "Device".into(),
                    identifier: new_key,
                });
            }
            self.devices.remove(current.device_identifier.as_str());
            debug!(from = %current.device_identifier, to = %next.device_identifier, "device rekeyed");
        }
        Ok(next)
    }

    async fn delete_device(&self, id: DeviceId) -> Result<Device, CoreError> {
        let _writes = self.device_writes.lock().await;
        let current = self.require_device(id)?;
        self.devices.remove(current.device_identifier.as_str());
        Ok(Device::clone(&current))
    }

    async fn devices(&self) -> Result<Vec<Device>, CoreError> {
        let mut devices: Vec<Device> = self
            .devices
            .values()
            .iter()
            .map(|d| Device::clone(d))
            .collect();
        devices.sort_by_key(|d| d.id);
        Ok(devices)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mac(raw: &str) -> DeviceIdentifier {
        DeviceIdentifier::new(raw)
    }

    #[tokio::test]
    async fn default_zone_is_seeded() {
        let inventory = MemoryInventory::new();
        let default = inventory.default_zone().await.unwrap();
        assert_eq!(default.id, ZoneId(1));
        assert!(default.is_default());
        assert_eq!(inventory.zones().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_zone_identifier_conflicts() {
        let inventory = MemoryInventory::new();
        inventory
            .insert_zone(NewZone::auto_created("edge"))
            .await
            .unwrap();
        let err = inventory
            .insert_zone(NewZone::auto_created("edge"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn device_cannot_join_missing_zone() {
        let inventory = MemoryInventory::new();
        let err = inventory
            .insert_device(NewDevice::discovered(&mac("aa:bb:cc:00:00:01"), Some(ZoneId(99))))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ZoneNotFound { .. }));
        assert!(inventory.devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_zone_moves_devices_to_default() {
        let inventory = MemoryInventory::new();
        let zone = inventory
            .insert_zone(NewZone::auto_created("branch"))
            .await
            .unwrap();
        let device = inventory
            .insert_device(NewDevice::discovered(&mac("aa:bb:cc:00:00:02"), Some(zone.id)))
            .await
            .unwrap();

        let moved = inventory.delete_zone(zone.id).await.unwrap();
        assert_eq!(moved, 1);
        assert!(inventory.zone_by_id(zone.id).await.unwrap().is_none());

        let device = inventory.device_by_id(device.id).await.unwrap().unwrap();
        assert_eq!(device.router_zone_id, Some(ZoneId(1)));
    }

    #[tokio::test]
    async fn renaming_identifier_rekeys_zone() {
        let inventory = MemoryInventory::new();
        let zone = inventory
            .insert_zone(NewZone::auto_created("old-router"))
            .await
            .unwrap();
        let update = ZoneUpdate {
            router_identifier: Some("new-router".into()),
            ..ZoneUpdate::default()
        };
        inventory.update_zone(zone.id, &update).await.unwrap();

        assert!(
            inventory
                .zone_by_identifier("old-router")
                .await
                .unwrap()
                .is_none()
        );
        let renamed = inventory.zone_by_id(zone.id).await.unwrap().unwrap();
        assert_eq!(renamed.router_identifier, "new-router");
    }

    #[tokio::test]
    async fn assign_device_moves_between_zones() {
        let inventory = MemoryInventory::new();
        let device = inventory
            .insert_device(NewDevice::discovered(&mac("AA:BB:CC:00:00:03"), None))
            .await
            .unwrap();
        assert!(device.is_unassigned());

        let moved = inventory
            .assign_device(device.id, Some(ZoneId(1)))
            .await
            .unwrap();
        assert_eq!(moved.router_zone_id, Some(ZoneId(1)));
        let found = inventory
            .device_by_identifier(&mac("aa:bb:cc:00:00:03"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.router_zone_id, Some(ZoneId(1)));
    }

    #[tokio::test]
    async fn update_device_rekeys_and_keeps_zone() {
        let inventory = MemoryInventory::new();
        let device = inventory
            .insert_device(NewDevice::discovered(&mac("aa:bb:cc:00:00:04"), Some(ZoneId(1))))
            .await
            .unwrap();
        let update = DeviceUpdate {
            device_identifier: Some(mac("aa:bb:cc:00:00:44")),
            device_name: Some("Camera".into()),
            router_zone_id: Some(None),
            ..DeviceUpdate::default()
        };

        let updated = inventory.update_device(device.id, &update).await.unwrap();
        assert_eq!(updated.device_name, "Camera");
        assert_eq!(updated.router_zone_id, Some(ZoneId(1)));
        assert!(
            inventory
                .device_by_identifier(&mac("aa:bb:cc:00:00:04"))
                .await
                .unwrap()
                .is_none()
        );
        let found = inventory.device_by_id(device.id).await.unwrap().unwrap();
        assert_eq!(found.device_identifier, mac("aa:bb:cc:00:00:44"));
    }

    #[tokio::test]
    async fn update_device_onto_taken_identifier_conflicts() {
        let inventory = MemoryInventory::new();
        let first = inventory
            .insert_device(NewDevice::discovered(&mac("aa:bb:cc:00:00:05"), None))
            .await
            .unwrap();
        inventory
            .insert_device(NewDevice::discovered(&mac("aa:bb:cc:00:00:06"), None))
            .await
            .unwrap();

        let update = DeviceUpdate {
            device_identifier: Some(mac("aa:bb:cc:00:00:06")),
            ..DeviceUpdate::default()
        };
        let err = inventory.update_device(first.id, &update).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
        let unchanged = inventory.device_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(unchanged.device_identifier, mac("aa:bb:cc:00:00:05"));
    }

    #[tokio::test]
    async fn delete_device_frees_identifier() {
        let inventory = MemoryInventory::new();
        let device = inventory
            .insert_device(NewDevice::discovered(&mac("aa:bb:cc:00:00:07"), None))
            .await
            .unwrap();

        let removed = inventory.delete_device(device.id).await.unwrap();
        assert_eq!(removed.id, device.id);
        assert!(inventory.device_by_id(device.id).await.unwrap().is_none());
        let err = inventory.delete_device(device.id).await.unwrap_err();
        assert!(matches!(err, CoreError::DeviceNotFound { .. }));

        inventory
            .insert_device(NewDevice::discovered(&mac("aa:bb:cc:00:00:07"), None))
            .await
            .unwrap();
    }
}
