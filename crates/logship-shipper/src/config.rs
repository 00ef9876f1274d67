//! Shipper configuration.

use std::path::PathBuf;
use std::time::Duration;

use logship_platform::ErrorPolicy;
use reqwest::Url;
use thiserror::Error;

/// Invalid shipper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// Configuration for the shipper pipeline.
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    /// Directories whose files are tailed (not recursively).
    pub watch_dirs: Vec<PathBuf>,
    /// Base URL of the receiver.
    pub receiver_addr: String,
    /// Interval between directory scans.
    pub poll_interval: Duration,
    /// Pause between reads when no complete line is buffered.
    pub framer_poll_interval: Duration,
    /// Chunks buffered between watcher and framer.
    pub sink_capacity: usize,
    /// Timeout for a single ingest request.
    pub request_timeout: Duration,
    /// Grace period for shutdown.
    pub shutdown_timeout: Duration,
    /// What to do when a line cannot be forwarded.
    pub error_policy: ErrorPolicy,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            watch_dirs: vec![PathBuf::from("./testdata")],
            receiver_addr: "http://localhost:8080".to_string(),
            poll_interval: Duration::from_secs(1),
            framer_poll_interval: Duration::from_secs(1),
            sink_capacity: 1024,
            request_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(1),
            error_policy: ErrorPolicy::FailSoft,
        }
    }
}

impl ShipperConfig {
    /// Create a configuration watching `watch_dirs` and shipping to `receiver_addr`.
    #[must_use]
    pub fn new(watch_dirs: Vec<PathBuf>, receiver_addr: impl Into<String>) -> Self {
        Self {
            watch_dirs,
            receiver_addr: receiver_addr.into(),
            ..Self::default()
        }
    }

    /// Set the directory scan interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the framer's idle poll interval.
    #[must_use]
    pub const fn with_framer_poll_interval(mut self, interval: Duration) -> Self {
        self.framer_poll_interval = interval;
        self
    }

    /// Set the watcher-to-framer buffer capacity.
    #[must_use]
    pub const fn with_sink_capacity(mut self, capacity: usize) -> Self {
        self.sink_capacity = capacity;
        self
    }

    /// Set the ingest request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the shutdown grace period.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the forward error policy.
    #[must_use]
    pub const fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch_dirs.is_empty() {
            return Err(ConfigError("watch_dirs cannot be empty".to_string()));
        }
        if self.watch_dirs.iter().any(|d| d.as_os_str().is_empty()) {
            return Err(ConfigError("watch_dirs cannot contain an empty path".to_string()));
        }

        let url = Url::parse(&self.receiver_addr).map_err(|e| {
            ConfigError(format!("receiver_addr {:?} is not a URL: {e}", self.receiver_addr))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError(format!(
                "receiver_addr must use http or https, got {}",
                url.scheme()
            )));
        }

        for (name, value) in [
            ("poll_interval", self.poll_interval),
            ("framer_poll_interval", self.framer_poll_interval),
            ("request_timeout", self.request_timeout),
            ("shutdown_timeout", self.shutdown_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError(format!("{name} must be positive")));
            }
        }

        if self.sink_capacity == 0 {
            return Err(ConfigError("sink_capacity must be positive".to_string()));
        }

        Ok(())
    }
}
