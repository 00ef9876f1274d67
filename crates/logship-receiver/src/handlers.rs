//! HTTP request handlers for the ingest API.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use logship_proto::LogRecord;
use serde::Deserialize;
use tracing::debug;

use crate::entry::LogEntry;
use crate::error::{IngestError, IngestResult};
use crate::repository::{Repository, SearchOptions};

/// Query parameters for listing entries.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Inclusive lower bound, RFC 3339.
    pub from: Option<String>,
    /// Inclusive upper bound, RFC 3339.
    pub to: Option<String>,
}

impl ListQuery {
    /// Parses the bounds into search options.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidParameter`] for a bound that is not RFC 3339.
    pub fn to_options(&self) -> IngestResult<SearchOptions> {
        Ok(SearchOptions {
            from: parse_bound("from", self.from.as_deref())?,
            to: parse_bound("to", self.to.as_deref())?,
        })
    }
}

fn parse_bound(name: &'static str, value: Option<&str>) -> IngestResult<Option<DateTime<Utc>>> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| IngestError::InvalidParameter {
                    name,
                    reason: e.to_string(),
                })
        })
        .transpose()
}

/// Handle GET /health.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Handle GET /logs - entries inside an optional time window.
pub async fn list_logs(
    State(repo): State<Arc<Repository>>,
    Query(query): Query<ListQuery>,
) -> IngestResult<Json<Vec<LogRecord>>> {
    let options = query.to_options()?;
    let records: Vec<LogRecord> = repo.get(&options).into_iter().map(LogRecord::from).collect();
    Ok(Json(records))
}

/// Handle POST /logs - store a batch of entries.
///
/// Entries are stored in order; the first rejected entry stops the batch and
/// entries before it stay stored.
pub async fn post_logs(State(repo): State<Arc<Repository>>, body: Bytes) -> IngestResult<StatusCode> {
    let batch: Vec<LogRecord> = serde_json::from_slice(&body)?;
    let count = batch.len();
    for record in batch {
        repo.create(LogEntry::from(record))?;
    }
    debug!(count, "stored log entries");
    Ok(StatusCode::OK)
}

/// Handle GET /logs/{id}.
pub async fn get_log(
    State(repo): State<Arc<Repository>>,
    Path(id): Path<String>,
) -> IngestResult<Json<LogRecord>> {
    let entry = repo.get_by_id(&id)?;
    Ok(Json(entry.into()))
}

/// Handle GET /logs/ - a lookup whose id segment is empty.
pub async fn get_log_without_id(
    State(repo): State<Arc<Repository>>,
) -> IngestResult<Json<LogRecord>> {
    let entry = repo.get_by_id("")?;
    Ok(Json(entry.into()))
}
