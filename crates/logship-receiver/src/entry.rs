//! The stored log entry.

use chrono::{DateTime, Utc};
use logship_platform::Record;
use logship_proto::{Attributes, LogRecord};

/// A log entry held by the receiver's store, keyed by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Unique identifier.
    pub id: String,
    /// Message text.
    pub message: String,
    /// Severity label.
    pub severity: String,
    /// Time the entry was produced.
    pub timestamp: DateTime<Utc>,
    /// Free-form attributes.
    pub attributes: Attributes,
}

impl Record for LogEntry {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl From<LogRecord> for LogEntry {
    fn from(record: LogRecord) -> Self {
        Self {
            id: record.id,
            message: record.message,
            severity: record.severity,
            timestamp: record.timestamp,
            attributes: record.attributes,
        }
    }
}

impl From<LogEntry> for LogRecord {
    fn from(entry: LogEntry) -> Self {
        Self {
            id: entry.id,
            message: entry.message,
            severity: entry.severity,
            timestamp: entry.timestamp,
            attributes: entry.attributes,
        }
    }
}
