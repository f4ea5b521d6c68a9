// ── Router zone domain types ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Router identifier of the zone that always exists.
pub const DEFAULT_ZONE_IDENTIFIER: &str = "default";

/// Numeric primary key of a router zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub i64);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A logical zone, identified by the router that reports telemetry for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterZone {
    pub id: ZoneId,
    /// Natural key; unique and stable.
    pub router_identifier: String,
    pub zone_name: String,
    pub router_name: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl RouterZone {
    pub fn is_default(&self) -> bool {
        self.router_identifier == DEFAULT_ZONE_IDENTIFIER
    }
}

/// Fields for creating a zone; the inventory assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewZone {
    pub router_identifier: String,
    pub zone_name: String,
    #[serde(default)]
    pub router_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl NewZone {
    /// The zone the provisioner creates on first sighting of an identifier.
    pub fn auto_created(router_identifier: &str) -> Self {
        Self {
            router_identifier: router_identifier.to_owned(),
            zone_name: format!("Zone {router_identifier}"),
            router_name: Some(router_identifier.to_owned()),
            description: Some("Created automatically from Netify telemetry".into()),
            is_active: true,
        }
    }

    pub fn default_zone() -> Self {
        Self {
            router_identifier: DEFAULT_ZONE_IDENTIFIER.into(),
            zone_name: "Default".into(),
            router_name: None,
            description: Some("Devices without a specific router zone".into()),
            is_active: true,
        }
    }
}

/// Partial administrative update of a zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneUpdate {
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(default)]
    pub router_identifier: Option<String>,
    #[serde(default)]
    pub router_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ZoneUpdate {
    pub fn apply(&self, zone: &mut RouterZone) {
        if let Some(ref name) = self.zone_name {
            zone.zone_name.clone_from(name);
        }
        if let Some(ref identifier) = self.router_identifier {
            zone.router_identifier.clone_from(identifier);
        }
        if let Some(ref router_name) = self.router_name {
            zone.router_name = Some(router_name.clone());
        }
        if let Some(ref description) = self.description {
            zone.description = Some(description.clone());
        }
        if let Some(active) = self.is_active {
            zone.is_active = active;
        }
    }
}

fn default_active() -> bool {
    true
}
