//! Assembly of the shipping pipeline.
//!
//! scheduler → directory watcher → byte channel → stream framer → forwarder.

use std::sync::Arc;

use logship_platform::{
    ByteSource, FramerConfig, FramerStats, Listener, PlatformError, Scheduler, StreamFramer, watch,
};
use tracing::info;

use crate::client::{IngestClient, LogSender, TransportError};
use crate::config::ShipperConfig;
use crate::decoder::JsonDecoder;
use crate::forwarder::{Forwarder, ForwarderStats};

/// A running watcher feeding a framer that forwards every line.
///
/// The watcher starts ticking as soon as the pipeline is built; lines are
/// forwarded once the pipeline is served as a [`Listener`].
pub struct Pipeline<S> {
    scheduler: Scheduler,
    framer: StreamFramer<ByteSource, Forwarder<JsonDecoder, S>>,
    forwarder_stats: Arc<ForwarderStats>,
}

impl Pipeline<IngestClient> {
    /// Builds a pipeline that ships to `config.receiver_addr` over HTTP.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver address is unusable.
    pub fn connect(config: &ShipperConfig) -> Result<Self, TransportError> {
        let client = IngestClient::new(&config.receiver_addr, config.request_timeout)?;
        Ok(Self::with_sender(config, client))
    }
}

impl<S: LogSender> Pipeline<S> {
    /// Builds a pipeline delivering through `sender`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_sender(config: &ShipperConfig, sender: S) -> Self {
        let scheduler = Scheduler::new();
        let source = watch(
            config.watch_dirs.clone(),
            config.poll_interval,
            &scheduler,
            config.sink_capacity,
        );

        let forwarder = Forwarder::new(JsonDecoder, sender);
        let forwarder_stats = forwarder.stats();
        let framer_config = FramerConfig::default()
            .with_poll_interval(config.framer_poll_interval)
            .with_error_policy(config.error_policy);

        info!(
            dirs = ?config.watch_dirs,
            poll_interval_ms = config.poll_interval.as_millis(),
            "watching directories"
        );

        Self {
            scheduler,
            framer: StreamFramer::with_config(source, forwarder, framer_config),
            forwarder_stats,
        }
    }

    /// Framer counters.
    pub fn framer_stats(&self) -> Arc<FramerStats> {
        self.framer.stats()
    }

    /// Forwarder counters.
    pub fn forwarder_stats(&self) -> Arc<ForwarderStats> {
        Arc::clone(&self.forwarder_stats)
    }
}

impl<S: LogSender> Listener for Pipeline<S> {
    async fn listen_and_serve(&self) -> Result<(), PlatformError> {
        self.framer.listen_and_serve().await
    }

    async fn shutdown(&self) -> Result<(), PlatformError> {
        self.scheduler.close();
        self.framer.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logship_platform::Server;
    use logship_proto::LogRecord;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<LogRecord>>>);

    impl LogSender for Collect {
        async fn send(&self, records: &[LogRecord]) -> Result<(), TransportError> {
            self.0.lock().extend_from_slice(records);
            Ok(())
        }
    }

    fn fast_config(dir: &TempDir) -> ShipperConfig {
        ShipperConfig::new(vec![dir.path().to_path_buf()], "http://localhost:8080")
            .with_poll_interval(Duration::from_millis(20))
            .with_framer_poll_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn connect_rejects_bad_address() {
        let dir = TempDir::new().unwrap();
        let mut config = fast_config(&dir);
        config.receiver_addr = "ftp://nowhere".to_string();
        assert!(Pipeline::connect(&config).is_err());
    }

    #[tokio::test]
    async fn forwards_lines_appended_to_watched_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("app.log"),
            "{\"id\":\"1\",\"@m\":\"first\"}\nnot json\n{\"id\":\"2\",\"@m\":\"second\"}\n",
        )
        .unwrap();

        let sink = Collect::default();
        let pipeline = Pipeline::with_sender(&fast_config(&dir), sink.clone());
        let stats = pipeline.forwarder_stats();
        let server = Arc::new(Server::new(pipeline));
        let stop = Arc::new(tokio::sync::Notify::new());

        let task = tokio::spawn({
            let server = Arc::clone(&server);
            let stop = Arc::clone(&stop);
            async move { server.serve_until(async move { stop.notified().await }).await }
        });

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while stats.forwarded() < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        stop.notify_one();
        task.await.unwrap().unwrap();

        let ids: Vec<String> = sink.0.lock().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(stats.decode_failures(), 1);
    }
}
