//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use netzone_config::Config;
use netzone_core::{Engine, MappingStore, MemoryInventory};

use crate::error::CliError;

/// Engine over the configured mapping document and a scratch inventory.
///
/// The CLI never sees the server's zones or devices, so dry runs only know
/// the default zone.
pub async fn local_engine(config: &Config) -> Result<Engine, CliError> {
    let store = MappingStore::open(&config.store.path).await?;
    Ok(Engine::new(Arc::new(store), Arc::new(MemoryInventory::new())))
}

/// Write pending mapping changes before the process exits.
pub async fn persist(engine: &Engine) -> Result<(), CliError> {
    engine.store().flush().await?;
    Ok(())
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
