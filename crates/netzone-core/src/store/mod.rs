// ── Storage ──
//
// Mapping configuration (owned, flushed to a JSON document) and the
// zone/device inventory collaborator.

mod collection;
mod inventory;
mod mapping_store;

pub use inventory::{Inventory, MemoryInventory};
pub use mapping_store::MappingStore;
