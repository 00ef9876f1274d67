//! Lifecycle wrapper for long-running listeners.
//!
//! A [`Listener`] is anything with a blocking run loop and a way to stop it:
//! the receiver's HTTP server and the shipper's stream framer both qualify.
//! [`Server`] runs one on its own task, waits for it to exit or for a stop
//! signal, then asks it to shut down within a fixed grace period.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::error::PlatformError;

/// Default grace period for [`Listener::shutdown`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// A component with a run loop that can be stopped from another task.
pub trait Listener: Send + Sync {
    /// Runs until the listener fails or is shut down.
    fn listen_and_serve(&self) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Stops the run loop and releases its resources.
    fn shutdown(&self) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

/// Runs a [`Listener`] until it exits or a stop signal arrives.
pub struct Server<L> {
    listener: Arc<L>,
    shutdown_timeout: Duration,
}

impl<L: Listener + 'static> Server<L> {
    /// Wraps `listener` with the default shutdown timeout.
    #[must_use]
    pub fn new(listener: L) -> Self {
        Self::from_arc(Arc::new(listener))
    }

    /// Wraps a listener that is shared with other owners.
    #[must_use]
    pub const fn from_arc(listener: Arc<L>) -> Self {
        Self {
            listener,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Sets the shutdown grace period.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Returns the wrapped listener.
    #[must_use]
    pub const fn listener(&self) -> &Arc<L> {
        &self.listener
    }

    /// Runs until the listener exits, SIGINT, or SIGTERM.
    ///
    /// # Errors
    ///
    /// See [`serve_until`](Self::serve_until).
    pub async fn serve(&self) -> Result<(), PlatformError> {
        self.serve_until(shutdown_signal()).await
    }

    /// Runs until the listener exits or `signal` completes, then shuts it down.
    ///
    /// # Errors
    ///
    /// Returns the listener's own error if it failed, otherwise any error
    /// from shutting it down, including [`PlatformError::ShutdownTimeout`]
    /// when the grace period elapses first.
    pub async fn serve_until<S>(&self, signal: S) -> Result<(), PlatformError>
    where
        S: Future<Output = ()>,
    {
        let listener = Arc::clone(&self.listener);
        let mut task = tokio::spawn(async move { listener.listen_and_serve().await });

        let run_result = tokio::select! {
            joined = &mut task => Some(flatten(joined)),
            () = signal => {
                info!("shutdown signal received");
                None
            }
        };

        if let Some(Err(e)) = &run_result {
            error!(error = %e, "listener failed");
        }

        let grace = self.shutdown_timeout;
        let stop = self.stop(&mut task, run_result.is_none());
        let shutdown_result = if let Ok(result) = tokio::time::timeout(grace, stop).await {
            result
        } else {
            warn!(timeout_ms = grace.as_millis(), "listener did not stop in time");
            Err(PlatformError::ShutdownTimeout(grace))
        };

        match run_result {
            Some(Err(e)) => Err(e),
            _ => shutdown_result,
        }
    }

    async fn stop(
        &self,
        task: &mut tokio::task::JoinHandle<Result<(), PlatformError>>,
        still_running: bool,
    ) -> Result<(), PlatformError> {
        self.listener.shutdown().await?;
        if still_running {
            flatten(task.await)?;
        }
        info!("listener stopped");
        Ok(())
    }
}

fn flatten(joined: Result<Result<(), PlatformError>, JoinError>) -> Result<(), PlatformError> {
    joined.map_err(|e| PlatformError::Task(e.to_string()))?
}

/// Completes on SIGINT, or on SIGTERM where the platform has it.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct MockListener {
        fail_run: bool,
        panic_run: bool,
        fail_shutdown: bool,
        hang_shutdown: bool,
        stop: CancellationToken,
        shutdown_calls: AtomicUsize,
    }

    impl Listener for MockListener {
        async fn listen_and_serve(&self) -> Result<(), PlatformError> {
            if self.panic_run {
                panic!("listener exploded");
            }
            if self.fail_run {
                return Err(std::io::Error::other("run failed").into());
            }
            self.stop.cancelled().await;
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), PlatformError> {
            self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
            if self.hang_shutdown {
                std::future::pending::<()>().await;
            }
            self.stop.cancel();
            if self.fail_shutdown {
                return Err(std::io::Error::other("shutdown failed").into());
            }
            Ok(())
        }
    }

    fn never() -> std::future::Pending<()> {
        std::future::pending()
    }

    #[tokio::test]
    async fn signal_stops_listener() {
        let server = Server::new(MockListener::default());

        server.serve_until(async {}).await.unwrap();

        assert_eq!(server.listener().shutdown_calls.load(Ordering::SeqCst), 1);
        assert!(server.listener().stop.is_cancelled());
    }

    #[tokio::test]
    async fn run_error_is_returned_and_listener_still_stopped() {
        let server = Server::new(MockListener {
            fail_run: true,
            ..MockListener::default()
        });

        let err = server.serve_until(never()).await.unwrap_err();

        assert!(err.to_string().contains("run failed"));
        assert_eq!(server.listener().shutdown_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_error_takes_precedence_over_shutdown_error() {
        let server = Server::new(MockListener {
            fail_run: true,
            fail_shutdown: true,
            ..MockListener::default()
        });

        let err = server.serve_until(never()).await.unwrap_err();
        assert!(err.to_string().contains("run failed"));
    }

    #[tokio::test]
    async fn shutdown_error_is_reported_after_signal() {
        let server = Server::new(MockListener {
            fail_shutdown: true,
            ..MockListener::default()
        });

        let err = server.serve_until(async {}).await.unwrap_err();
        assert!(err.to_string().contains("shutdown failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_shutdown_times_out() {
        let server = Server::new(MockListener {
            hang_shutdown: true,
            ..MockListener::default()
        })
        .with_shutdown_timeout(Duration::from_millis(200));

        let err = server.serve_until(async {}).await.unwrap_err();
        assert!(matches!(err, PlatformError::ShutdownTimeout(d) if d == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn panicking_listener_is_a_task_error() {
        let server = Server::new(MockListener {
            panic_run: true,
            ..MockListener::default()
        });

        let err = server.serve_until(never()).await.unwrap_err();
        assert!(matches!(err, PlatformError::Task(_)));
    }
}
