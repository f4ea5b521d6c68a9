// ── Core error types ──
//
// User-facing errors from netzone-core. Validation and policy outcomes
// are distinct variants so the HTTP and CLI layers can map them to the
// right status without string matching.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Validation errors ────────────────────────────────────────────
    #[error("Invalid mapping type: {kind}")]
    InvalidMappingType { kind: String },

    #[error("Invalid key for {kind}: {reason}")]
    InvalidKey { kind: String, reason: String },

    #[error("Invalid value for {kind}: {reason}")]
    InvalidValue { kind: String, reason: String },

    #[error("Invalid IPv4 address: {ip}")]
    InvalidIp { ip: String },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Mapping not found: {kind} has no key {key}")]
    MappingNotFound { kind: String, key: String },

    #[error("Router zone not found: {identifier}")]
    ZoneNotFound { identifier: String },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Policy outcomes ──────────────────────────────────────────────
    #[error("Telemetry rejected: unknown router zone {}", identifier.as_deref().unwrap_or("<unmapped>"))]
    UnknownZoneRejected { identifier: Option<String> },

    #[error("Telemetry rejected: unknown device {identifier}")]
    UnknownDeviceRejected { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Router zone '{identifier}' is protected: {reason}")]
    ProtectedZone { identifier: String, reason: String },

    #[error("{entity_type} '{identifier}' already exists")]
    Conflict {
        entity_type: String,
        identifier: String,
    },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Request-local validation failure; the caller should fix the input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidMappingType { .. }
                | Self::InvalidKey { .. }
                | Self::InvalidValue { .. }
                | Self::InvalidIp { .. }
        )
    }

    /// Telemetry dropped by the configured Netify policy.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownZoneRejected { .. } | Self::UnknownDeviceRejected { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MappingNotFound { .. } | Self::ZoneNotFound { .. } | Self::DeviceNotFound { .. }
        )
    }

    /// Name of the request field a validation failure refers to.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidMappingType { .. } => Some("type"),
            Self::InvalidKey { .. } => Some("key"),
            Self::InvalidValue { .. } => Some("value"),
            Self::InvalidIp { .. } => Some("ip"),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence {
            message: format!("invalid mapping document: {err}"),
        }
    }
}
