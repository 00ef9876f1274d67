//! HTTP client for the receiver's ingest API.

use std::future::Future;
use std::time::Duration;

use logship_proto::LogRecord;
use reqwest::Url;
use thiserror::Error;

/// Errors raised while delivering records to the receiver.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The receiver address is not a usable base URL.
    #[error("invalid receiver address {addr}: {reason}")]
    InvalidAddress {
        /// Address as configured.
        addr: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The request could not be built or sent, or timed out.
    #[error("sending entry to receiver: {0}")]
    Request(#[from] reqwest::Error),

    /// The receiver answered with a non-success status.
    #[error("receiver responded with unsuccessful status code {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
}

/// Delivers batches of records to an ingest endpoint.
pub trait LogSender: Send + Sync {
    /// Sends `records` as one batch.
    fn send(&self, records: &[LogRecord]) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// [`LogSender`] that posts JSON batches to `{base}/logs`.
#[derive(Debug, Clone)]
pub struct IngestClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl IngestClient {
    /// Creates a client for the receiver at `base` (for example `http://localhost:8080`).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidAddress`] if `base` is not an
    /// `http`/`https` URL, or [`TransportError::Request`] if the HTTP client
    /// cannot be built.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, TransportError> {
        let invalid = |reason: String| TransportError::InvalidAddress {
            addr: base.to_string(),
            reason,
        };

        let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        let endpoint = url.join("logs").map_err(|e| invalid(e.to_string()))?;

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    /// The URL batches are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl LogSender for IngestClient {
    async fn send(&self, records: &[LogRecord]) -> Result<(), TransportError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(records)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
