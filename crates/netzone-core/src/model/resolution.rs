// ── Identity queries and resolution traces ──

use serde::{Deserialize, Serialize};

use super::mapping::MappingType;

/// What the resolver is asked about.
///
/// `router_key` is the secondary key for `router_mapping`; when absent
/// the IP is used for that lookup too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityQuery {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
}

impl IdentityQuery {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            router_key: None,
            interface: None,
        }
    }

    pub fn with_router_key(mut self, key: impl Into<String>) -> Self {
        self.router_key = Some(key.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }
}

/// Explainable trace of how an identity was (or was not) resolved.
///
/// Serializes with the field names of the dashboard's `test_result`
/// object; a miss is an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub ip: String,
    #[serde(rename = "router_identifier_mapping")]
    pub router_identifier_mapping_hit: Option<String>,
    #[serde(rename = "router_mapping")]
    pub router_mapping_hit: Option<String>,
    #[serde(rename = "interface_mapping")]
    pub interface_mapping_hit: Option<String>,
    /// First non-null hit in priority order.
    #[serde(skip)]
    pub resolved_zone_identifier: Option<String>,
}

impl ResolutionResult {
    pub fn hit(&self, kind: MappingType) -> Option<&str> {
        match kind {
            MappingType::RouterIdentifierMapping => self.router_identifier_mapping_hit.as_deref(),
            MappingType::RouterMapping => self.router_mapping_hit.as_deref(),
            MappingType::InterfaceMapping => self.interface_mapping_hit.as_deref(),
        }
    }

    /// Which table supplied `resolved_zone_identifier`, if any.
    pub fn resolved_by(&self) -> Option<MappingType> {
        MappingType::PRIORITY
            .into_iter()
            .find(|kind| self.hit(*kind).is_some())
    }
}
