//! Telemetry identity resolution and router zone provisioning.
//!
//! Given a telemetry record identified only by a source IP (plus an
//! optional router key and interface name), decide which router zone and
//! which device it belongs to, and apply the Netify admission policy:
//! reject it, fall back to the default zone or an unassigned device, or
//! auto-create what it references.
//!
//! - **[`Engine`]**: facade owning the [`MappingStore`] and an
//!   [`Inventory`]; every server and CLI operation goes through it.
//! - **[`MappingStore`]**: the three mapping tables and the policy, read as
//!   lock-free snapshots, mutated under one lock, flushed to a JSON file.
//! - **[`resolve`]**: pure lookup in priority order, producing an
//!   explainable [`ResolutionResult`].
//! - **[`provision`]**: idempotent zone/device upserts driven by
//!   [`effective_policy`].
//! - **[`Engine::test`]**: dry run with a [`ZonePreview`] of what live
//!   traffic would get.
//! - **[`IngestPipeline`]**: bounded worker pool over [`Engine::ingest`].

pub mod engine;
pub mod error;
pub mod harness;
pub mod ingest;
pub mod model;
pub mod provisioner;
pub mod resolver;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use engine::{DeviceFilter, Engine, ZoneScope};
pub use error::CoreError;
pub use harness::{TestReport, ZonePreview};
pub use ingest::{IngestHandle, IngestPipeline, IngestStats, TelemetryRecord};
pub use provisioner::{DeviceDecision, ProvisionOutcome, ZoneDecision, provision};
pub use resolver::resolve;
pub use store::{Inventory, MappingStore, MemoryInventory};

pub use model::{
    DEFAULT_ZONE_IDENTIFIER, Device, DeviceId, DeviceIdentifier, DeviceStats, DeviceUpdate,
    IdentityQuery, MappingConfig, MappingEntry, MappingTables, MappingType, NetifySettings,
    NewDevice, NewZone, PolicyOutcome, PolicyPatch, ResolutionResult, RouterZone,
    ZoneDeviceStats, ZoneId, ZoneUpdate, effective_policy,
};
