//! # logship-proto
//!
//! Wire types exchanged between the log shipper and the ingest receiver.
//!
//! - [`LogRecord`] - one log entry as it travels over `POST /logs` and `GET /logs`
//! - [`AttributeValue`] - closed value type for free-form attributes
//! - [`ErrorResponse`] - error body returned by the receiver

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attribute;
pub mod record;

pub use attribute::{AttributeValue, Attributes};
pub use record::{ErrorResponse, LogRecord, zero_timestamp};
