//! Receiver configuration.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Invalid receiver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// Configuration for the ingest service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Grace period for in-flight requests on shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

impl ReceiverConfig {
    /// Create a configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError("shutdown_timeout must be positive".to_string()));
        }
        Ok(())
    }
}
