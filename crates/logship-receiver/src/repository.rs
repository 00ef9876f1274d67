//! Query layer over the in-memory entry store.

use chrono::{DateTime, Utc};
use logship_platform::MemoryStore;

use crate::entry::LogEntry;
use crate::error::{IngestError, IngestResult};

/// Time window for [`Repository::get`]. Both bounds are inclusive; a missing
/// bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Earliest timestamp to include.
    pub from: Option<DateTime<Utc>>,
    /// Latest timestamp to include.
    pub to: Option<DateTime<Utc>>,
}

impl SearchOptions {
    /// Sets the lower bound.
    #[must_use]
    pub const fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the upper bound.
    #[must_use]
    pub const fn with_to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Returns true if `timestamp` falls inside the window.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| timestamp >= from) && self.to.is_none_or(|to| timestamp <= to)
    }
}

/// Stores and retrieves [`LogEntry`] values.
#[derive(Default)]
pub struct Repository {
    store: MemoryStore<LogEntry>,
}

impl Repository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository over an existing store.
    #[must_use]
    pub const fn with_store(store: MemoryStore<LogEntry>) -> Self {
        Self { store }
    }

    /// Returns the entry stored under `id`.
    ///
    /// # Errors
    ///
    /// [`IngestError::InvalidId`] for an empty id, checked before the store is
    /// consulted; otherwise the store's error with context.
    pub fn get_by_id(&self, id: &str) -> IngestResult<LogEntry> {
        if id.is_empty() {
            return Err(IngestError::InvalidId);
        }
        self.store.get(id).map_err(|source| IngestError::Store {
            context: "getting log entry".to_string(),
            source,
        })
    }

    /// Returns every entry inside the window, in no particular order.
    #[must_use]
    pub fn get(&self, options: &SearchOptions) -> Vec<LogEntry> {
        self.store.find(|entry| options.contains(entry.timestamp))
    }

    /// Returns every stored entry.
    #[must_use]
    pub fn all(&self) -> Vec<LogEntry> {
        self.store.find(|_| true)
    }

    /// Stores `entry`, replacing any entry with the same id, and returns it.
    ///
    /// # Errors
    ///
    /// Fails if the entry id is empty.
    pub fn create(&self, entry: LogEntry) -> IngestResult<LogEntry> {
        self.store
            .insert(entry.clone())
            .map_err(|source| IngestError::Store {
                context: "inserting log entry".to_string(),
                source,
            })?;
        Ok(entry)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
