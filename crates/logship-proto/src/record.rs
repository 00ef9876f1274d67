//! Log record and error body exchanged over the ingest API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attribute::Attributes;

/// Timestamp used when a source line carries no usable time.
#[must_use]
pub fn zero_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// A log entry as sent by the shipper and returned by the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique identifier of the entry.
    #[serde(default)]
    pub id: String,
    /// Rendered message text.
    #[serde(default)]
    pub message: String,
    /// Severity as written by the producing application.
    #[serde(default)]
    pub severity: String,
    /// When the entry was produced (RFC 3339 on the wire).
    #[serde(default = "zero_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Remaining free-form fields.
    #[serde(default)]
    pub attributes: Attributes,
}

impl LogRecord {
    /// Creates a record with the given id and message and no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            severity: String::new(),
            timestamp: zero_timestamp(),
            attributes: Attributes::new(),
        }
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = severity.into();
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds one attribute.
    #[must_use]
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<crate::AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Error body returned by the receiver for any failed request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human readable error messages.
    pub errors: Vec<String>,
}

impl ErrorResponse {
    /// Creates a response carrying a single message.
    #[must_use]
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}
