// ── Mapping store ──
//
// Owns the three mapping tables and the Netify policy. Reads are
// lock-free `ArcSwap` snapshots; every mutation is a read-modify-write
// under one async mutex, so concurrent add/remove calls never interleave.
// Each published change bumps a revision on a `watch` channel, which the
// background flusher follows.
//
// The document on disk may also be written by another process (the CLI
// next to a running server). The store remembers the document it last
// read or wrote plus the changes made since; before writing, and on the
// flusher's poll, a changed file is adopted and those changes replayed
// over it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{MappingConfig, MappingType, NetifySettings, PolicyPatch};

/// A mutation not yet written to disk.
#[derive(Debug, Clone)]
enum PendingChange {
    Add {
        kind: MappingType,
        key: String,
        value: String,
    },
    Remove {
        kind: MappingType,
        key: String,
    },
    Policy(PolicyPatch),
}

impl PendingChange {
    /// Re-apply over a document another writer produced. Removing a key
    /// that is already gone is not an error here.
    fn replay(&self, config: &mut MappingConfig) {
        match self {
            Self::Add { kind, key, value } => {
                config
                    .mappings
                    .table_mut(*kind)
                    .insert(key.clone(), value.clone());
            }
            Self::Remove { kind, key } => {
                config.mappings.table_mut(*kind).remove(key);
            }
            Self::Policy(patch) => config.netify_settings.apply(patch),
        }
    }
}

/// What the store knows about the file. Guarded by the write lock.
#[derive(Debug, Default)]
struct DiskState {
    /// The document as last read from or written to disk.
    baseline: MappingConfig,
    pending: Vec<PendingChange>,
}

/// Durable, atomically-updatable holder of mapping tables and policy.
pub struct MappingStore {
    current: ArcSwap<MappingConfig>,
    write_lock: Mutex<DiskState>,
    path: Option<PathBuf>,
    revision: watch::Sender<u64>,
    flushed_revision: AtomicU64,
}

impl MappingStore {
    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self::with_config(MappingConfig::default())
    }

    pub fn with_config(config: MappingConfig) -> Self {
        Self::build(config, None)
    }

    /// Load the mapping document at `path`, starting empty if it does not
    /// exist yet. Later [`flush`](Self::flush) calls write back to `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let config = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no mapping document yet, starting empty");
                MappingConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            mappings = config.mappings.len(),
            "loaded router mapping configuration"
        );
        Ok(Self::build(config, Some(path)))
    }

    fn build(config: MappingConfig, path: Option<PathBuf>) -> Self {
        let (revision, _) = watch::channel(0u64);
        let disk = DiskState {
            baseline: config.clone(),
            pending: Vec::new(),
        };
        Self {
            current: ArcSwap::from_pointee(config),
            write_lock: Mutex::new(disk),
            path,
            revision,
            flushed_revision: AtomicU64::new(0),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Full, consistent snapshot of mappings and policy.
    pub fn snapshot(&self) -> Arc<MappingConfig> {
        self.current.load_full()
    }

    pub fn policy(&self) -> NetifySettings {
        self.current.load().netify_settings
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Monotonic counter, bumped by every successful mutation.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Whether there are mutations not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        self.path.is_some() && self.revision() != self.flushed_revision.load(Ordering::Acquire)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Insert or overwrite a mapping (last write wins).
    ///
    /// Returns the previous value for the key, if there was one.
    pub async fn add(
        &self,
        kind: MappingType,
        key: &str,
        value: &str,
    ) -> Result<Option<String>, CoreError> {
        let key = kind.validate_key(key)?;
        let value = kind.validate_value(value)?;
        let change = PendingChange::Add {
            kind,
            key: key.clone(),
            value: value.clone(),
        };
        let previous = self
            .mutate(change, |config| {
                Ok(config
                    .mappings
                    .table_mut(kind)
                    .insert(key.clone(), value.clone()))
            })
            .await?;
        debug!(%kind, %key, %value, replaced = previous.is_some(), "mapping stored");
        Ok(previous)
    }

    /// Delete a mapping, returning the value it held.
    pub async fn remove(&self, kind: MappingType, key: &str) -> Result<String, CoreError> {
        let key = key.trim();
        let change = PendingChange::Remove {
            kind,
            key: key.to_owned(),
        };
        let removed = self
            .mutate(change, |config| {
                config
                    .mappings
                    .table_mut(kind)
                    .remove(key)
                    .ok_or_else(|| CoreError::MappingNotFound {
                        kind: kind.to_string(),
                        key: key.to_owned(),
                    })
            })
            .await?;
        debug!(%kind, %key, "mapping removed");
        Ok(removed)
    }

    /// Merge a partial policy over the current one.
    pub async fn update_policy(&self, patch: &PolicyPatch) -> Result<NetifySettings, CoreError> {
        let settings = self
            .mutate(PendingChange::Policy(*patch), |config| {
                config.netify_settings.apply(patch);
                Ok(config.netify_settings)
            })
            .await?;
        info!(?settings, "netify policy updated");
        Ok(settings)
    }

    async fn mutate<R>(
        &self,
        change: PendingChange,
        apply: impl FnOnce(&mut MappingConfig) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let mut disk = self.write_lock.lock().await;
        let mut next = MappingConfig::clone(&self.current.load());
        let out = apply(&mut next)?;
        self.current.store(Arc::new(next));
        if self.path.is_some() {
            disk.pending.push(change);
        }
        self.revision.send_modify(|r| *r += 1);
        Ok(out)
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Write the current snapshot to disk (temp file + rename).
    ///
    /// If another process changed the file since this store last saw it,
    /// that version is adopted first and local changes replayed on top.
    /// Returns `false` for in-memory stores.
    pub async fn flush(&self) -> Result<bool, CoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };

        // Holding the write lock pins snapshot and revision together.
        let mut disk = self.write_lock.lock().await;
        self.merge_external(path, &mut disk).await?;
        let revision = self.revision();
        let snapshot = self.current.load_full();
        let document = serde_json::to_vec_pretty(&*snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp, document).await?;
        tokio::fs::rename(&tmp, path).await?;

        disk.baseline = MappingConfig::clone(&snapshot);
        disk.pending.clear();
        self.flushed_revision.store(revision, Ordering::Release);
        debug!(path = %path.display(), revision, "mapping document flushed");
        Ok(true)
    }

    /// Pick up changes another process wrote to the mapping document.
    ///
    /// Returns whether the file had changed. In-memory stores never do.
    pub async fn reload(&self) -> Result<bool, CoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };
        let mut disk = self.write_lock.lock().await;
        self.merge_external(path, &mut disk).await
    }

    async fn merge_external(&self, path: &Path, disk: &mut DiskState) -> Result<bool, CoreError> {
        let on_disk: MappingConfig = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if on_disk == disk.baseline {
            return Ok(false);
        }

        let mut next = on_disk.clone();
        for change in &disk.pending {
            change.replay(&mut next);
        }
        info!(
            path = %path.display(),
            replayed = disk.pending.len(),
            "mapping document changed on disk, reloaded"
        );
        disk.baseline = on_disk;
        self.current.store(Arc::new(next));
        self.revision.send_modify(|r| *r += 1);
        if disk.pending.is_empty() {
            // Nothing of ours to write back.
            self.flushed_revision.store(self.revision(), Ordering::Release);
        }
        Ok(true)
    }

    /// Spawn a task that flushes `debounce` after each burst of changes
    /// and once more when `cancel` fires. Every `debounce` it also checks
    /// the file for changes made by another process.
    pub fn spawn_flusher(
        self: &Arc<Self>,
        debounce: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(flush_task(store, debounce, cancel))
    }
}

async fn flush_task(store: Arc<MappingStore>, debounce: Duration, cancel: CancellationToken) {
    let mut changes = store.subscribe();
    let mut poll = tokio::time::interval_at(tokio::time::Instant::now() + debounce, debounce);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(debounce) => {}
                }
                changes.borrow_and_update();
                if !store.is_dirty() {
                    continue;
                }
                if let Err(e) = store.flush().await {
                    warn!(error = %e, "periodic mapping flush failed");
                }
            }
            _ = poll.tick() => {
                if let Err(e) = store.reload().await {
                    warn!(error = %e, "mapping document reload failed");
                }
            }
        }
    }

    if store.is_dirty() {
        if let Err(e) = store.flush().await {
            warn!(error = %e, "final mapping flush failed");
        }
    }
}
