//! Route configuration for the ingest API.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers::{get_log, get_log_without_id, health, list_logs, post_logs};
use crate::repository::Repository;

/// Create the ingest API router.
pub fn create_router(repo: Arc<Repository>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/logs", get(list_logs).post(post_logs))
        .route("/logs/", get(get_log_without_id))
        .route("/logs/{id}", get(get_log))
        .with_state(repo)
        .layer(TraceLayer::new_for_http())
}
