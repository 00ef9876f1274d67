//! # logship-shipper
//!
//! Tails log files and ships every line to a logship receiver.
//!
//! A [`Pipeline`] scans the configured directories on a fixed interval,
//! hands newly appended bytes to a stream framer, decodes each line with
//! [`JsonDecoder`] and posts it to the receiver through [`IngestClient`].
//! Lines that fail to decode or deliver are logged and counted; the
//! pipeline moves on to the next line unless configured to fail fast.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod decoder;
pub mod forwarder;
pub mod pipeline;

pub use client::{IngestClient, LogSender, TransportError};
pub use config::{ConfigError, ShipperConfig};
pub use decoder::{DecodeError, JsonDecoder, SourceDecoder, parse_timestamp};
pub use forwarder::{ForwardError, Forwarder, ForwarderStats};
pub use pipeline::Pipeline;
