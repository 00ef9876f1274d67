//! Error types for the ingest service and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use logship_platform::StoreError;
use logship_proto::ErrorResponse;
use thiserror::Error;
use tracing::warn;

/// Result type alias for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while storing or querying log entries.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The requested entry id is empty.
    #[error("ID cannot be empty")]
    InvalidId,

    /// A query parameter could not be parsed.
    #[error("invalid query parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The store rejected the operation.
    #[error("{context}: {source}")]
    Store {
        /// What was being attempted.
        context: String,
        /// Underlying store error.
        source: StoreError,
    },

    /// The request body is not a valid batch of log entries.
    #[error("failed to decode request body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Any other failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidId
            | Self::InvalidParameter { .. }
            | Self::Store {
                source: StoreError::MissingId,
                ..
            } => StatusCode::BAD_REQUEST,
            Self::Store {
                source: StoreError::NotFound(_),
                ..
            } => StatusCode::NOT_FOUND,
            Self::Decode(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "request has failed");
        (status, Json(ErrorResponse::single(self.to_string()))).into_response()
    }
}
