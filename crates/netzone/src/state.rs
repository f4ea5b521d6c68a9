//! Shared state for the HTTP handlers.

use netzone_core::{Engine, IngestHandle};

use crate::api::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub ingest: IngestHandle,
    read_only: bool,
}

impl AppState {
    pub fn new(engine: Engine, ingest: IngestHandle, read_only: bool) -> Self {
        Self {
            engine,
            ingest,
            read_only,
        }
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Gate for every handler that mutates configuration or inventory.
    pub fn ensure_writable(&self) -> Result<(), ApiError> {
        if self.read_only {
            return Err(ApiError::read_only());
        }
        Ok(())
    }
}
