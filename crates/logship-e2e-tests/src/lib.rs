//! End-to-end tests for logship.
//!
//! These tests run a real receiver on a loopback port and a real shipper
//! pipeline watching a temporary directory:
//! - appended lines reach the receiver's store
//! - malformed or rejected lines do not stop the pipeline
//! - the ingest API answers queries over HTTP

#![cfg(test)]
