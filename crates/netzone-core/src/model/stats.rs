// ── Device statistics ──
//
// Aggregate counts behind `GET /devices/stats`.

use serde::{Deserialize, Serialize};

use super::device::Device;
use super::zone::{RouterZone, ZoneId};

/// Per-zone device counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDeviceStats {
    pub id: ZoneId,
    pub zone_name: String,
    pub router_name: Option<String>,
    pub router_identifier: String,
    pub device_count: usize,
    pub active_device_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub total_devices: usize,
    pub active_devices: usize,
    pub inactive_devices: usize,
    pub total_routers: usize,
    pub unassigned_devices: usize,
    pub router_zones: Vec<ZoneDeviceStats>,
}

impl DeviceStats {
    /// Compute counts from full zone and device listings.
    pub fn compute(zones: &[RouterZone], devices: &[Device]) -> Self {
        let active_devices = devices.iter().filter(|d| d.is_active).count();

        let mut router_zones: Vec<ZoneDeviceStats> = zones
            .iter()
            .map(|zone| {
                let in_zone = devices
                    .iter()
                    .filter(|d| d.router_zone_id == Some(zone.id));
                let (device_count, active_device_count) =
                    in_zone.fold((0, 0), |(all, active), d| {
                        (all + 1, active + usize::from(d.is_active))
                    });
                ZoneDeviceStats {
                    id: zone.id,
                    zone_name: zone.zone_name.clone(),
                    router_name: zone.router_name.clone(),
                    router_identifier: zone.router_identifier.clone(),
                    device_count,
                    active_device_count,
                }
            })
            .collect();
        router_zones.sort_by_key(|z| z.id);

        Self {
            total_devices: devices.len(),
            active_devices,
            inactive_devices: devices.len() - active_devices,
            total_routers: zones.len(),
            unassigned_devices: devices.iter().filter(|d| d.is_unassigned()).count(),
            router_zones,
        }
    }

    pub fn zone(&self, id: ZoneId) -> Option<&ZoneDeviceStats> {
        self.router_zones.iter().find(|z| z.id == id)
    }
}
