//! # logship-receiver
//!
//! Ingest service for shipped log entries.
//!
//! Entries posted to `POST /logs` are kept in a concurrent in-memory store
//! and can be read back by id or by inclusive time window:
//!
//! - `POST /logs` stores a JSON array of entries
//! - `GET /logs?from=<RFC3339>&to=<RFC3339>` lists entries in the window
//! - `GET /logs/{id}` returns one entry
//! - `GET /health` answers 200 with an empty body
//!
//! Failures answer with `{"errors": [...]}`: 400 for an empty id or a bad
//! query parameter, 404 for an unknown id, 500 for anything else.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod entry;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod routes;
pub mod server;

pub use config::{ConfigError, ReceiverConfig};
pub use entry::LogEntry;
pub use error::{IngestError, IngestResult};
pub use repository::{Repository, SearchOptions};
pub use routes::create_router;
pub use server::HttpListener;
