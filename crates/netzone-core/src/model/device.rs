// ── Device domain types ──

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::zone::ZoneId;

/// Numeric primary key of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub i64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Natural key of a device, normalized like a MAC address
/// (trimmed, lowercase, colon-separated).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIdentifier(String);

impl DeviceIdentifier {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase().replace('-', ":"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceIdentifier {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// A device seen in telemetry or registered by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_identifier: DeviceIdentifier,
    pub device_name: String,
    pub device_type: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    /// `None` while the device waits for manual zone assignment.
    pub router_zone_id: Option<ZoneId>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn is_unassigned(&self) -> bool {
        self.router_zone_id.is_none()
    }
}

/// Fields for creating a device; the inventory assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDevice {
    pub device_identifier: DeviceIdentifier,
    pub device_name: String,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub router_zone_id: Option<ZoneId>,
}

impl NewDevice {
    /// The device the provisioner registers on first sighting.
    ///
    /// `zone` is `None` when policy accepts the record but leaves the
    /// device for manual assignment.
    pub fn discovered(identifier: &DeviceIdentifier, zone: Option<ZoneId>) -> Self {
        Self {
            device_identifier: identifier.clone(),
            device_name: format!("Device {identifier}"),
            device_type: None,
            description: Some("Discovered from Netify telemetry".into()),
            is_active: true,
            router_zone_id: zone,
        }
    }
}

/// Partial device edit, as sent by the device form.
///
/// `router_zone_id` tells "absent" (keep the zone) from `null` (unassign).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceUpdate {
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub device_identifier: Option<DeviceIdentifier>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub router_zone_id: Option<Option<ZoneId>>,
}

impl DeviceUpdate {
    /// Apply everything but the zone. Blank optional text clears the field.
    pub fn apply(&self, device: &mut Device) {
        if let Some(ref name) = self.device_name {
            device.device_name.clone_from(name);
        }
        if let Some(ref identifier) = self.device_identifier {
            device.device_identifier = identifier.clone();
        }
        if let Some(ref device_type) = self.device_type {
            device.device_type = non_blank(device_type);
        }
        if let Some(ref description) = self.description {
            device.description = non_blank(description);
        }
        if let Some(active) = self.is_active {
            device.is_active = active;
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn default_active() -> bool {
    true
}
