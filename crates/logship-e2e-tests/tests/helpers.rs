//! Test helpers for E2E tests.

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use logship_platform::{PlatformError, Server};
use logship_receiver::{HttpListener, Repository};
use logship_shipper::{ForwarderStats, Pipeline, ShipperConfig};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default test timeout.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A receiver serving on an ephemeral loopback port.
pub struct TestReceiver {
    pub addr: SocketAddr,
    pub repo: Arc<Repository>,
    stop: CancellationToken,
    handle: JoinHandle<Result<(), PlatformError>>,
}

impl TestReceiver {
    /// Start a receiver on an available port.
    pub async fn start() -> Self {
        let repo = Arc::new(Repository::new());
        let listener = HttpListener::bind(([127, 0, 0, 1], 0).into(), Arc::clone(&repo))
            .await
            .unwrap();
        let addr = listener.local_addr();
        let stop = CancellationToken::new();

        let signal = stop.clone().cancelled_owned();
        let handle = tokio::spawn(async move { Server::new(listener).serve_until(signal).await });

        Self {
            addr,
            repo,
            stop,
            handle,
        }
    }

    /// Base URL of the ingest API.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the receiver and wait for it to exit.
    pub async fn shutdown(self) {
        self.stop.cancel();
        tokio::time::timeout(TEST_TIMEOUT, self.handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}

/// A shipper pipeline watching its own temporary directory.
pub struct TestShipper {
    pub dir: TempDir,
    pub stats: Arc<ForwarderStats>,
    stop: CancellationToken,
    handle: JoinHandle<Result<(), PlatformError>>,
}

impl TestShipper {
    /// Start a shipper that forwards to `receiver_url`.
    pub fn start(receiver_url: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let config = ShipperConfig::new(vec![dir.path().to_path_buf()], receiver_url)
            .with_poll_interval(Duration::from_millis(50))
            .with_framer_poll_interval(Duration::from_millis(10))
            .with_request_timeout(Duration::from_secs(2));
        config.validate().unwrap();

        let pipeline = Pipeline::connect(&config).unwrap();
        let stats = pipeline.forwarder_stats();
        let stop = CancellationToken::new();

        let signal = stop.clone().cancelled_owned();
        let handle = tokio::spawn(async move { Server::new(pipeline).serve_until(signal).await });

        Self {
            dir,
            stats,
            stop,
            handle,
        }
    }

    /// Path of a file inside the watched directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Stop the pipeline and wait for it to exit.
    pub async fn shutdown(self) {
        self.stop.cancel();
        tokio::time::timeout(TEST_TIMEOUT, self.handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}

/// Append `data` to `path`, creating it if needed.
pub fn append(path: &Path, data: &str) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(data.as_bytes()).unwrap();
}

/// Poll `condition` until it holds or [`TEST_TIMEOUT`] elapses.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
