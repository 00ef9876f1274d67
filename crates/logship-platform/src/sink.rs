//! Bounded byte hand-off between a single producer and a single consumer.
//!
//! The directory watcher writes appended file content into a [`ByteSink`];
//! the stream framer reads it back through a [`ByteSource`]. The channel is
//! bounded, so a lagging consumer applies backpressure to the producer
//! instead of letting the buffer grow without limit.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::WatchError;

/// Creates a connected sink/source pair holding at most `capacity` pending chunks.
#[must_use]
pub fn byte_channel(capacity: usize) -> (ByteSink, ByteSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ByteSink { tx },
        ByteSource {
            rx,
            pending: Bytes::new(),
        },
    )
}

/// Producer half of the byte channel.
#[derive(Debug, Clone)]
pub struct ByteSink {
    tx: mpsc::Sender<Bytes>,
}

impl ByteSink {
    /// Writes a chunk, waiting for room if the consumer lags.
    ///
    /// Empty chunks are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::SinkClosed`] if the source was dropped.
    pub async fn write(&self, chunk: impl Into<Bytes>) -> Result<(), WatchError> {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return Ok(());
        }
        self.tx.send(chunk).await.map_err(|_| WatchError::SinkClosed)
    }

    /// Returns true if the source half has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of the byte channel.
///
/// Reading never waits for data: when nothing is queued the read completes
/// with zero bytes, which callers treat as "drained for now".
#[derive(Debug)]
pub struct ByteSource {
    rx: mpsc::Receiver<Bytes>,
    pending: Bytes,
}

impl ByteSource {
    /// Returns true if all sinks are gone and nothing is left to read.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty() && self.rx.is_closed() && self.rx.is_empty()
    }
}

impl AsyncRead for ByteSource {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        while buf.remaining() > 0 {
            if this.pending.is_empty() {
                match this.rx.try_recv() {
                    Ok(chunk) => this.pending = chunk,
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }
            let n = this.pending.len().min(buf.remaining());
            buf.put_slice(&this.pending[..n]);
            this.pending.advance(n);
        }
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn reads_written_chunks_in_order() {
        let (sink, mut source) = byte_channel(4);
        sink.write("hello ").await.unwrap();
        sink.write(Bytes::from_static(b"world")).await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = source.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello world");
    }

    #[tokio::test]
    async fn empty_channel_reads_zero_bytes() {
        let (_sink, mut source) = byte_channel(4);
        let mut buf = [0u8; 8];
        assert_eq!(source.read(&mut buf).await.unwrap(), 0);
        assert!(!source.is_finished());
    }

    #[tokio::test]
    async fn partial_reads_keep_the_remainder() {
        let (sink, mut source) = byte_channel(1);
        sink.write("abcdef").await.unwrap();

        let mut small = [0u8; 4];
        assert_eq!(source.read(&mut small).await.unwrap(), 4);
        assert_eq!(&small, b"abcd");

        let mut rest = [0u8; 4];
        let n = source.read(&mut rest).await.unwrap();
        assert_eq!(&rest[..n], b"ef");
    }

    #[tokio::test]
    async fn full_channel_applies_backpressure() {
        let (sink, mut source) = byte_channel(1);
        sink.write("first").await.unwrap();

        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            sink.write("second"),
        )
        .await;
        assert!(blocked.is_err(), "second write should wait for the reader");

        let mut buf = [0u8; 16];
        let n = source.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"first");
        sink.write("second").await.unwrap();
    }

    #[tokio::test]
    async fn closed_source_fails_writes() {
        let (sink, source) = byte_channel(1);
        drop(source);
        assert!(sink.is_closed());
        assert!(matches!(sink.write("x").await, Err(WatchError::SinkClosed)));
    }

    #[tokio::test]
    async fn finished_after_sink_dropped_and_drained() {
        let (sink, mut source) = byte_channel(2);
        sink.write("x").await.unwrap();
        drop(sink);

        assert!(!source.is_finished());
        let mut buf = [0u8; 4];
        assert_eq!(source.read(&mut buf).await.unwrap(), 1);
        assert!(source.is_finished());
    }
}
