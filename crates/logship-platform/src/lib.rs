//! # logship-platform
//!
//! Building blocks shared by the logship services.
//!
//! - [`Scheduler`] - runs jobs on a fixed interval until cancelled
//! - [`DirectoryWatcher`] - tails files in watched directories, one scan per tick
//! - [`byte_channel`] - bounded hand-off of appended bytes from watcher to framer
//! - [`StreamFramer`] - splits a byte source into newline-delimited messages
//! - [`Server`] / [`Listener`] - run a listener until failure or OS signal, then stop it
//! - [`MemoryStore`] - concurrent keyed record store
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use logship_platform::{Scheduler, watch};
//!
//! # async fn run() {
//! let scheduler = Scheduler::new();
//! let source = watch(vec!["/var/log/app".into()], Duration::from_secs(1), &scheduler, 1024);
//! // hand `source` to a StreamFramer
//! # drop(source);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod framer;
pub mod scheduler;
pub mod server;
pub mod sink;
pub mod store;
pub mod watcher;

pub use error::{PlatformError, StoreError, WatchError};
pub use framer::{ErrorPolicy, FramerConfig, FramerStats, Message, MessageHandler, StreamFramer};
pub use scheduler::{JobHandle, Scheduler};
pub use server::{Listener, Server, shutdown_signal};
pub use sink::{ByteSink, ByteSource, byte_channel};
pub use store::{MemoryStore, Record};
pub use watcher::{DirectoryWatcher, READ_CHUNK_SIZE, ScanReport, watch};
