//! `netzone serve`: HTTP API, ingestion workers and the background flusher.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use netzone_config::Config;
use netzone_core::{Engine, IngestPipeline, MappingStore, MemoryInventory};

use crate::api;
use crate::cli::ServeArgs;
use crate::error::CliError;
use crate::state::AppState;

pub async fn handle(args: ServeArgs, mut config: Config) -> Result<(), CliError> {
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    config.server.read_only |= args.read_only;
    let addr = config.listen_addr()?;

    let store = Arc::new(MappingStore::open(&config.store.path).await?);
    let engine = Engine::new(Arc::clone(&store), Arc::new(MemoryInventory::new()));

    let cancel = CancellationToken::new();
    let flusher = store.spawn_flusher(config.flush_interval(), cancel.child_token());
    let pipeline = IngestPipeline::spawn(
        engine.clone(),
        config.ingest.workers,
        config.ingest.queue_capacity,
        cancel.child_token(),
    );

    let state = AppState::new(engine, pipeline.handle(), config.server.read_only);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        read_only = config.server.read_only,
        store = %config.store.path.display(),
        "netzone API listening"
    );

    axum::serve(listener, api::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain queued telemetry, then let the flusher write the final state.
    let stats = pipeline.shutdown().await;
    info!(?stats, "ingestion drained");
    cancel.cancel();
    if let Err(e) = flusher.await {
        warn!(error = %e, "mapping flusher did not stop cleanly");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
