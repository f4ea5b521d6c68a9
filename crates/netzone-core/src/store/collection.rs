// ── Keyed entity collection ──
//
// Concurrent storage with O(1) lookups by natural key and by numeric id.
// `insert_new` is atomic per key, which is what makes provisioning
// upserts safe under duplicate delivery.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// A concurrent collection for a single entity type.
pub(crate) struct EntityCollection<T: Send + Sync + 'static> {
    /// Primary storage: natural key -> entity.
    by_key: DashMap<String, Arc<T>>,

    /// Secondary index: numeric id -> natural key.
    id_to_key: DashMap<i64, String>,

    /// Reverse of `id_to_key` for efficient removal.
    key_to_id: DashMap<String, i64>,
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        Self {
            by_key: DashMap::new(),
            id_to_key: DashMap::new(),
            key_to_id: DashMap::new(),
        }
    }

    /// Insert only if the key is vacant.
    ///
    /// Returns the stored entity, or `Err` with the entity already holding
    /// the key.
    pub(crate) fn insert_new(&self, key: String, id: i64, entity: T) -> Result<Arc<T>, Arc<T>> {
        match self.by_key.entry(key) {
            Entry::Occupied(existing) => Err(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                let key = slot.key().clone();
                let entity = Arc::new(entity);
                slot.insert(Arc::clone(&entity));
                self.id_to_key.insert(id, key.clone());
                self.key_to_id.insert(key, id);
                Ok(entity)
            }
        }
    }

    /// Replace the entity stored under an existing key.
    ///
    /// Returns `false` (and stores nothing) if the key is absent.
    pub(crate) fn replace(&self, key: &str, entity: T) -> bool {
        match self.by_key.get_mut(key) {
            Some(mut slot) => {
                *slot = Arc::new(entity);
                true
            }
            None => false,
        }
    }

    /// Remove an entity by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            if let Some((_, id)) = self.key_to_id.remove(key) {
                // Only drop the id mapping if it still points here; a rekey
                // may already have moved it.
                self.id_to_key.remove_if(&id, |_, k| k == key);
            }
        }
        removed
    }

    pub(crate) fn get_by_key(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn get_by_id(&self, id: i64) -> Option<Arc<T>> {
        // Release the index guard before touching `by_key`; `insert_new`
        // takes the locks in the opposite order.
        let key = self.key_of(id)?;
        self.by_key.get(&key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn key_of(&self, id: i64) -> Option<String> {
        self.id_to_key.get(&id).map(|k| k.value().clone())
    }

    /// Point-in-time copy of every entity.
    pub(crate) fn values(&self) -> Vec<Arc<T>> {
        self.by_key.iter().map(|r| Arc::clone(r.value())).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }
}
