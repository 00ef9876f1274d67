//! Error types for the platform primitives.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`MemoryStore`](crate::MemoryStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The record or lookup key has an empty identifier.
    #[error("missing record ID")]
    MissingId,

    /// No record is stored under the identifier.
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Errors raised while scanning watched directories.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A directory could not be listed.
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file could not be opened, inspected, or read.
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The consumer side of the byte channel is gone.
    #[error("byte sink closed")]
    SinkClosed,
}

/// Errors raised by listeners and the lifecycle wrapper.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// An I/O error occurred while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message handler failed under the fail-fast policy.
    #[error("message handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The listener was started twice.
    #[error("listener already started")]
    AlreadyStarted,

    /// The listener task panicked or was aborted.
    #[error("listener task failed: {0}")]
    Task(String),

    /// The listener did not stop within the grace period.
    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_messages() {
        assert_eq!(StoreError::MissingId.to_string(), "missing record ID");
        assert_eq!(
            StoreError::NotFound("abc".to_string()).to_string(),
            "record not found: abc"
        );
    }

    #[test]
    fn watch_error_names_path() {
        let err = WatchError::ReadFile {
            path: PathBuf::from("/var/log/app.log"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/var/log/app.log"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn platform_error_display() {
        let err = PlatformError::ShutdownTimeout(Duration::from_secs(1));
        assert_eq!(err.to_string(), "shutdown did not complete within 1s");

        let err: PlatformError = std::io::Error::other("boom").into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
        assert_send_sync::<WatchError>();
        assert_send_sync::<PlatformError>();
    }
}
