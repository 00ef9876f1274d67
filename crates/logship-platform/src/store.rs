//! Concurrent in-memory record storage.
//!
//! [`MemoryStore`] keeps records keyed by their own identifier. Keys are
//! spread across independently locked shards, so writers to different keys
//! rarely contend. Full scans walk the shards one at a time and therefore see
//! a weakly consistent view: records inserted while a scan is running may or
//! may not be observed.

use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};

use parking_lot::RwLock;

use crate::error::StoreError;

/// Default number of shards.
const DEFAULT_SHARDS: usize = 16;

/// A record that knows its own unique key.
pub trait Record: Clone + Send + Sync {
    /// Returns the record identifier. An empty identifier is invalid.
    fn record_id(&self) -> &str;
}

/// Thread-safe keyed store for any [`Record`].
pub struct MemoryStore<T> {
    shards: Box<[RwLock<HashMap<String, T>>]>,
    hasher: RandomState,
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> MemoryStore<T> {
    /// Creates an empty store with the default shard count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates an empty store with `shards` shards (at least one).
    #[must_use]
    pub fn with_shards(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, id: &str) -> &RwLock<HashMap<String, T>> {
        let idx = (self.hasher.hash_one(id) as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Inserts a record, replacing any record with the same identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingId`] if the record identifier is empty.
    pub fn insert(&self, record: T) -> Result<(), StoreError> {
        let id = record.record_id();
        if id.is_empty() {
            return Err(StoreError::MissingId);
        }
        let key = id.to_string();
        self.shard(&key).write().insert(key, record);
        Ok(())
    }

    /// Returns a copy of the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingId`] for an empty id and
    /// [`StoreError::NotFound`] if nothing is stored under it.
    pub fn get(&self, id: &str) -> Result<T, StoreError> {
        if id.is_empty() {
            return Err(StoreError::MissingId);
        }
        self.shard(id)
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Returns copies of all records matching `predicate`, in no particular order.
    pub fn find<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut found = Vec::new();
        for shard in &self.shards {
            let records = shard.read();
            found.extend(records.values().filter(|r| predicate(r)).cloned());
        }
        found
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }
}
