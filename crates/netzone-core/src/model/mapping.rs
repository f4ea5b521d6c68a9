// ── Mapping tables ──
//
// Three independent key -> value tables addressed by a closed enum.
// Keys are unique per table; a write replaces the prior value.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::policy::NetifySettings;
use crate::error::CoreError;

/// Which mapping table an entry lives in.
///
/// Variant order is resolution priority: an identifier-mapping hit beats a
/// router-mapping hit, which beats an interface-mapping hit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MappingType {
    /// IPv4 address -> router identifier.
    RouterIdentifierMapping,
    /// Router-side key -> mapping string.
    RouterMapping,
    /// Interface name -> mapping string.
    InterfaceMapping,
}

impl MappingType {
    /// All kinds, highest resolution priority first.
    pub const PRIORITY: [Self; 3] = [
        Self::RouterIdentifierMapping,
        Self::RouterMapping,
        Self::InterfaceMapping,
    ];

    /// Parse the wire name (`router_identifier_mapping`, ...).
    pub fn parse(kind: &str) -> Result<Self, CoreError> {
        Self::from_str(kind.trim()).map_err(|_| CoreError::InvalidMappingType {
            kind: kind.to_owned(),
        })
    }

    /// Validate and canonicalize a key for this table.
    pub fn validate_key(self, key: &str) -> Result<String, CoreError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CoreError::InvalidKey {
                kind: self.to_string(),
                reason: "key must not be empty".into(),
            });
        }
        match self {
            Self::RouterIdentifierMapping => parse_ipv4(key)
                .map(|addr| addr.to_string())
                .map_err(|_| CoreError::InvalidKey {
                    kind: self.to_string(),
                    reason: format!("'{key}' is not a valid IPv4 address"),
                }),
            Self::RouterMapping | Self::InterfaceMapping => Ok(key.to_owned()),
        }
    }

    pub fn validate_value(self, value: &str) -> Result<String, CoreError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(CoreError::InvalidValue {
                kind: self.to_string(),
                reason: "value must not be empty".into(),
            });
        }
        Ok(value.to_owned())
    }
}

/// Parse a dotted-quad IPv4 address, rejecting anything else.
pub fn parse_ipv4(ip: &str) -> Result<Ipv4Addr, CoreError> {
    Ipv4Addr::from_str(ip.trim()).map_err(|_| CoreError::InvalidIp { ip: ip.to_owned() })
}

/// The three mapping tables, serialized under their wire names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTables {
    #[serde(default)]
    pub router_identifier_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub router_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub interface_mapping: BTreeMap<String, String>,
}

impl MappingTables {
    pub fn table(&self, kind: MappingType) -> &BTreeMap<String, String> {
        match kind {
            MappingType::RouterIdentifierMapping => &self.router_identifier_mapping,
            MappingType::RouterMapping => &self.router_mapping,
            MappingType::InterfaceMapping => &self.interface_mapping,
        }
    }

    pub fn table_mut(&mut self, kind: MappingType) -> &mut BTreeMap<String, String> {
        match kind {
            MappingType::RouterIdentifierMapping => &mut self.router_identifier_mapping,
            MappingType::RouterMapping => &mut self.router_mapping,
            MappingType::InterfaceMapping => &mut self.interface_mapping,
        }
    }

    pub fn lookup(&self, kind: MappingType, key: &str) -> Option<&str> {
        self.table(kind).get(key).map(String::as_str)
    }

    /// Total number of entries across all tables.
    pub fn len(&self) -> usize {
        MappingType::PRIORITY
            .iter()
            .map(|kind| self.table(*kind).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into `(kind, key, value)` rows in priority order.
    pub fn entries(&self) -> Vec<MappingEntry> {
        MappingType::PRIORITY
            .iter()
            .flat_map(|kind| {
                self.table(*kind).iter().map(|(key, value)| MappingEntry {
                    kind: *kind,
                    key: key.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    }
}

/// A single row of a mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    #[serde(rename = "type")]
    pub kind: MappingType,
    pub key: String,
    pub value: String,
}

/// Full snapshot of the mapping configuration.
///
/// This is both the persisted document and the body of
/// `GET /router-mapping/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub mappings: MappingTables,
    #[serde(default)]
    pub netify_settings: NetifySettings,
}
