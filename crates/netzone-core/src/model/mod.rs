// ── Domain model ──
//
// Mapping tables and policy (configuration), router zones and devices
// (inventory), and the transient resolution trace that links them.

pub mod device;
pub mod mapping;
pub mod policy;
pub mod resolution;
pub mod stats;
pub mod zone;

// ── Re-exports ──────────────────────────────────────────────────────

// Configuration
pub use mapping::{MappingConfig, MappingEntry, MappingTables, MappingType, parse_ipv4};
pub use policy::{NetifySettings, PolicyOutcome, PolicyPatch, effective_policy};

// Inventory
pub use device::{Device, DeviceId, DeviceIdentifier, DeviceUpdate, NewDevice};
pub use zone::{DEFAULT_ZONE_IDENTIFIER, NewZone, RouterZone, ZoneId, ZoneUpdate};

// Resolution
pub use resolution::{IdentityQuery, ResolutionResult};
pub use stats::{DeviceStats, ZoneDeviceStats};
