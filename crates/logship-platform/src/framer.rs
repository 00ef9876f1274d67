//! Newline framing over a continuous byte source.
//!
//! [`StreamFramer`] drains any [`AsyncRead`] source, splits it into
//! newline-terminated messages and hands each one to a [`MessageHandler`]
//! strictly in order. A source that momentarily has nothing to read reports
//! a zero-length read; the framer then pauses for its poll interval and
//! tries again. Bytes after the last newline stay buffered until the rest of
//! the line arrives.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PlatformError;
use crate::server::Listener;

/// Default pause when the source has no complete line.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default upper bound for a single line.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// One framed line, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    data: Bytes,
}

impl Message {
    /// Creates a message from raw bytes.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Returns the message bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the message and returns its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

/// Processes framed messages.
pub trait MessageHandler: Send + Sync {
    /// Error returned when a message cannot be processed.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handles one message.
    fn handle(&self, message: Message) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// What the framer does when the handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log the failure, count it, and continue with the next message.
    #[default]
    FailSoft,
    /// Stop the framer and return the handler error.
    FailFast,
}

/// Framer settings.
#[derive(Debug, Clone)]
pub struct FramerConfig {
    /// Pause between reads when no complete line is available.
    pub poll_interval: Duration,
    /// Lines longer than this are discarded.
    pub max_line_length: usize,
    /// Handling of handler failures.
    pub error_policy: ErrorPolicy,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl FramerConfig {
    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the maximum line length.
    #[must_use]
    pub const fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Sets the error policy.
    #[must_use]
    pub const fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}

/// Counters kept by a running framer.
#[derive(Debug, Default)]
pub struct FramerStats {
    handled: AtomicU64,
    failed: AtomicU64,
}

impl FramerStats {
    /// Messages the handler accepted.
    #[must_use]
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Messages the handler rejected.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Codec that yields only newline-terminated lines.
///
/// A trailing `\r` is stripped and blank lines are skipped. Lines exceeding
/// the maximum length are dropped up to and including their newline.
#[derive(Debug)]
struct LineCodec {
    next_index: usize,
    max_length: usize,
    discarding: bool,
}

impl LineCodec {
    const fn new(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            discarding: false,
        }
    }
}

impl Decoder for LineCodec {
    type Item = Message;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, io::Error> {
        loop {
            let Some(offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') else {
                if buf.len() > self.max_length {
                    if !self.discarding {
                        warn!(limit = self.max_length, "line exceeds maximum length; discarding");
                    }
                    self.discarding = true;
                    buf.clear();
                    self.next_index = 0;
                } else {
                    self.next_index = buf.len();
                }
                return Ok(None);
            };

            let newline = self.next_index + offset;
            self.next_index = 0;
            let mut line = buf.split_to(newline + 1);

            if std::mem::take(&mut self.discarding) || newline > self.max_length {
                continue;
            }

            line.truncate(newline);
            if line.last() == Some(&b'\r') {
                line.truncate(newline - 1);
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(Message::new(line.freeze())));
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, io::Error> {
        // A drained source is not the end of the stream; keep any partial line.
        self.decode(buf)
    }
}

/// Listener that frames a byte source into messages for a handler.
pub struct StreamFramer<R, H> {
    framed: tokio::sync::Mutex<Option<FramedRead<R, LineCodec>>>,
    handler: H,
    config: FramerConfig,
    stats: Arc<FramerStats>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
}

impl<R, H> StreamFramer<R, H>
where
    R: AsyncRead + Unpin + Send,
    H: MessageHandler,
{
    /// Creates a framer with the default configuration.
    #[must_use]
    pub fn new(source: R, handler: H) -> Self {
        Self::with_config(source, handler, FramerConfig::default())
    }

    /// Creates a framer with an explicit configuration.
    #[must_use]
    pub fn with_config(source: R, handler: H, config: FramerConfig) -> Self {
        let codec = LineCodec::new(config.max_line_length);
        Self {
            framed: tokio::sync::Mutex::new(Some(FramedRead::new(source, codec))),
            handler,
            config,
            stats: Arc::new(FramerStats::default()),
            shutdown: CancellationToken::new(),
            stopped: CancellationToken::new(),
        }
    }

    /// Returns the shared counters.
    #[must_use]
    pub fn stats(&self) -> Arc<FramerStats> {
        Arc::clone(&self.stats)
    }

    /// Returns the handler.
    #[must_use]
    pub const fn handler(&self) -> &H {
        &self.handler
    }

    async fn run(&self) -> Result<(), PlatformError> {
        let Some(mut framed) = self.framed.lock().await.take() else {
            if self.shutdown.is_cancelled() {
                return Ok(());
            }
            return Err(PlatformError::AlreadyStarted);
        };
        let _stopped = self.stopped.clone().drop_guard();

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis(),
            policy = ?self.config.error_policy,
            "stream framer started"
        );

        loop {
            let next = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                next = framed.next() => next,
            };

            match next {
                Some(Ok(message)) => self.dispatch(message).await?,
                Some(Err(e)) => {
                    warn!(error = %e, "failed to read from source");
                    self.pause().await;
                }
                None => self.pause().await,
            }
        }

        info!(
            handled = self.stats.handled(),
            failed = self.stats.failed(),
            "stream framer stopped"
        );
        Ok(())
    }

    async fn dispatch(&self, message: Message) -> Result<(), PlatformError> {
        match self.handler.handle(message).await {
            Ok(()) => {
                self.stats.handled.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                match self.config.error_policy {
                    ErrorPolicy::FailSoft => {
                        warn!(error = %e, "failed to handle message; continuing");
                        Ok(())
                    }
                    ErrorPolicy::FailFast => Err(PlatformError::Handler(Box::new(e))),
                }
            }
        }
    }

    async fn pause(&self) {
        tokio::select! {
            () = self.shutdown.cancelled() => {}
            () = tokio::time::sleep(self.config.poll_interval) => {}
        }
    }
}

impl<R, H> Listener for StreamFramer<R, H>
where
    R: AsyncRead + Unpin + Send,
    H: MessageHandler,
{
    async fn listen_and_serve(&self) -> Result<(), PlatformError> {
        self.run().await
    }

    async fn shutdown(&self) -> Result<(), PlatformError> {
        self.shutdown.cancel();
        // Never started: dropping the reader here releases the source.
        if self.framed.lock().await.take().is_some() {
            return Ok(());
        }
        self.stopped.cancelled().await;
        debug!("stream framer source released");
        Ok(())
    }
}
