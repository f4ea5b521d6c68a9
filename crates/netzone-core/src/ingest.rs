// ── Telemetry ingestion ──
//
// Bounded queue drained by a small worker pool. Records are independent:
// a rejected or malformed record is counted, logged and dropped, and the
// workers move on.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::Engine;
use crate::error::CoreError;
use crate::model::IdentityQuery;

/// One telemetry record as reported by a router-side agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub source_ip: String,
    /// Secondary key for `router_mapping`, when the agent reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    pub device_identifier: String,
}

impl TelemetryRecord {
    pub fn new(source_ip: impl Into<String>, device_identifier: impl Into<String>) -> Self {
        Self {
            source_ip: source_ip.into(),
            router_key: None,
            interface: None,
            device_identifier: device_identifier.into(),
        }
    }

    pub fn query(&self) -> IdentityQuery {
        IdentityQuery {
            ip: self.source_ip.clone(),
            router_key: self.router_key.clone(),
            interface: self.interface.clone(),
        }
    }
}

/// Point-in-time pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub accepted: u64,
    pub rejected_zone: u64,
    pub rejected_device: u64,
    pub invalid: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU64,
    rejected_zone: AtomicU64,
    rejected_device: AtomicU64,
    invalid: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> IngestStats {
        IngestStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_zone: self.rejected_zone.load(Ordering::Relaxed),
            rejected_device: self.rejected_device.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn record(&self, record: &TelemetryRecord, result: Result<(), CoreError>) {
        let counter = match result {
            Ok(()) => &self.accepted,
            Err(e @ CoreError::UnknownZoneRejected { .. }) => {
                warn!(ip = %record.source_ip, error = %e, "telemetry dropped by zone policy");
                &self.rejected_zone
            }
            Err(e @ CoreError::UnknownDeviceRejected { .. }) => {
                warn!(
                    device = %record.device_identifier,
                    error = %e,
                    "telemetry dropped by device policy"
                );
                &self.rejected_device
            }
            Err(e) if e.is_validation() => {
                warn!(ip = %record.source_ip, error = %e, "malformed telemetry dropped");
                &self.invalid
            }
            Err(e) => {
                error!(ip = %record.source_ip, error = %e, "telemetry provisioning failed");
                &self.failed
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cloneable submission side of an [`IngestPipeline`].
///
/// The workers stop once every handle and the pipeline itself are gone.
#[derive(Clone)]
pub struct IngestHandle {
    sender: mpsc::Sender<TelemetryRecord>,
    counters: Arc<Counters>,
}

impl IngestHandle {
    /// Queue a record, waiting for room when the queue is full.
    pub async fn submit(&self, record: TelemetryRecord) -> Result<(), CoreError> {
        self.sender
            .send(record)
            .await
            .map_err(|_| CoreError::Internal("ingestion pipeline is closed".into()))
    }

    pub fn stats(&self) -> IngestStats {
        self.counters.snapshot()
    }
}

/// A running ingestion worker pool.
pub struct IngestPipeline {
    handle: IngestHandle,
    workers: Vec<JoinHandle<()>>,
}

impl IngestPipeline {
    /// Start `workers` tasks draining a queue of `capacity` records.
    ///
    /// Cancelling `cancel` stops the workers without draining.
    pub fn spawn(
        engine: Engine,
        workers: usize,
        capacity: usize,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let workers = (0..workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_task(
                    worker,
                    engine.clone(),
                    Arc::clone(&receiver),
                    Arc::clone(&counters),
                    cancel.clone(),
                ))
            })
            .collect::<Vec<_>>();
        info!(workers = workers.len(), capacity, "ingestion pipeline started");

        Self {
            handle: IngestHandle { sender, counters },
            workers,
        }
    }

    pub fn handle(&self) -> IngestHandle {
        self.handle.clone()
    }

    pub async fn submit(&self, record: TelemetryRecord) -> Result<(), CoreError> {
        self.handle.submit(record).await
    }

    pub fn stats(&self) -> IngestStats {
        self.handle.stats()
    }

    /// Close this side of the queue, wait for the workers to drain it,
    /// and return final counts. Outstanding [`IngestHandle`]s keep the
    /// queue open until they are dropped.
    pub async fn shutdown(self) -> IngestStats {
        let counters = Arc::clone(&self.handle.counters);
        drop(self.handle);
        for handle in self.workers {
            if let Err(e) = handle.await {
                error!(error = %e, "ingestion worker panicked");
            }
        }
        let stats = counters.snapshot();
        info!(?stats, "ingestion pipeline stopped");
        stats
    }
}

async fn worker_task(
    worker: usize,
    engine: Engine,
    receiver: Arc<Mutex<mpsc::Receiver<TelemetryRecord>>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = async { receiver.lock().await.recv().await } => next,
        };
        let Some(record) = next else { break };

        let result = engine.ingest(&record).await.map(|_| ());
        counters.record(&record, result);
    }
    debug!(worker, "ingestion worker exiting");
}
