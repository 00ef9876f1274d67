//! Decodes framed lines and forwards them to the receiver.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use logship_platform::{Message, MessageHandler};
use thiserror::Error;
use tracing::debug;

use crate::client::{LogSender, TransportError};
use crate::decoder::{DecodeError, SourceDecoder};

/// Why a line could not be forwarded.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The line could not be decoded.
    #[error("decoding raw log entry: {0}")]
    Decode(#[from] DecodeError),

    /// The receiver could not be reached or rejected the entry.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Per-outcome counters.
#[derive(Debug, Default)]
pub struct ForwarderStats {
    forwarded: AtomicU64,
    decode_failures: AtomicU64,
    transport_failures: AtomicU64,
}

impl ForwarderStats {
    /// Entries delivered to the receiver.
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Lines that failed to decode.
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// Entries the receiver did not accept.
    pub fn transport_failures(&self) -> u64 {
        self.transport_failures.load(Ordering::Relaxed)
    }
}

/// [`MessageHandler`] that decodes each line and sends it as a one-entry batch.
pub struct Forwarder<D, S> {
    decoder: D,
    sender: S,
    stats: Arc<ForwarderStats>,
}

impl<D: SourceDecoder, S: LogSender> Forwarder<D, S> {
    /// Creates a forwarder.
    pub fn new(decoder: D, sender: S) -> Self {
        Self {
            decoder,
            sender,
            stats: Arc::new(ForwarderStats::default()),
        }
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<ForwarderStats> {
        Arc::clone(&self.stats)
    }

    /// Decodes and sends one line.
    ///
    /// # Errors
    ///
    /// Returns the decode or transport error; the matching counter is bumped.
    pub async fn forward(&self, data: &[u8]) -> Result<(), ForwardError> {
        let record = self.decoder.decode(data).inspect_err(|_| {
            self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
        })?;

        let id = record.id.clone();
        self.sender
            .send(std::slice::from_ref(&record))
            .await
            .inspect_err(|_| {
                self.stats.transport_failures.fetch_add(1, Ordering::Relaxed);
            })?;

        self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
        debug!(id = %id, "forwarded log entry");
        Ok(())
    }
}

impl<D: SourceDecoder, S: LogSender> MessageHandler for Forwarder<D, S> {
    type Error = ForwardError;

    async fn handle(&self, message: Message) -> Result<(), ForwardError> {
        self.forward(message.data()).await
    }
}
