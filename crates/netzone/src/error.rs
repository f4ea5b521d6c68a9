//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use netzone_config::ConfigError;
use netzone_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(netzone::not_found),
        help("List what exists with: {list_command}")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(netzone::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    #[error("Router zone '{identifier}' is protected: {reason}")]
    #[diagnostic(code(netzone::protected_zone))]
    ProtectedZone { identifier: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netzone::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid mapping type '{kind}'")]
    #[diagnostic(
        code(netzone::mapping_type),
        help("Use one of: router_identifier_mapping, router_mapping, interface_mapping")
    )]
    MappingType { kind: String },

    // ── Policy ───────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(netzone::policy_rejected),
        help("Inspect the policy with: netzone policy show")
    )]
    PolicyRejected { message: String },

    // ── Configuration / storage ──────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(netzone::config),
        help("Check the file printed by: netzone config path")
    )]
    Config(Box<ConfigError>),

    #[error("Mapping store error: {message}")]
    #[diagnostic(
        code(netzone::store),
        help("Check store.path in the configuration and its permissions.")
    )]
    Store { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(netzone::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(netzone::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(netzone::internal))]
    Internal(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::ProtectedZone { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::MappingType { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::PolicyRejected { .. } => exit_code::REJECTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidMappingType { kind } => CliError::MappingType { kind },

            CoreError::InvalidKey { kind, reason } => CliError::Validation {
                field: format!("{kind} key"),
                reason,
            },

            CoreError::InvalidValue { kind, reason } => CliError::Validation {
                field: format!("{kind} value"),
                reason,
            },

            CoreError::InvalidIp { ip } => CliError::Validation {
                field: "ip".into(),
                reason: format!("'{ip}' is not a valid IPv4 address"),
            },

            CoreError::MappingNotFound { kind, key } => CliError::NotFound {
                resource_type: kind,
                identifier: key,
                list_command: "netzone mappings list".into(),
            },

            CoreError::ZoneNotFound { identifier } => CliError::NotFound {
                resource_type: "router zone".into(),
                identifier,
                list_command: "GET /api/router-zones".into(),
            },

            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "GET /api/devices".into(),
            },

            e @ (CoreError::UnknownZoneRejected { .. }
            | CoreError::UnknownDeviceRejected { .. }) => CliError::PolicyRejected {
                message: e.to_string(),
            },

            CoreError::ProtectedZone { identifier, reason } => {
                CliError::ProtectedZone { identifier, reason }
            }

            CoreError::Conflict {
                entity_type,
                identifier,
            } => CliError::Conflict {
                resource_type: entity_type,
                identifier,
            },

            CoreError::Persistence { message } => CliError::Store { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
