//! HTTP listener for the ingest API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use logship_platform::{Listener, PlatformError};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::repository::Repository;
use crate::routes::create_router;

/// Serves the ingest API on a bound TCP socket.
///
/// The socket is bound in [`bind`](Self::bind), so the address (including an
/// OS-assigned port) is known before serving starts.
pub struct HttpListener {
    socket: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    router: Router,
    shutdown: CancellationToken,
}

impl HttpListener {
    /// Binds `addr` and prepares the router over `repo`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, repo: Arc<Repository>) -> std::io::Result<Self> {
        let socket = TcpListener::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        Ok(Self {
            socket: Mutex::new(Some(socket)),
            local_addr,
            router: create_router(repo),
            shutdown: CancellationToken::new(),
        })
    }

    /// Address the socket is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Listener for HttpListener {
    async fn listen_and_serve(&self) -> Result<(), PlatformError> {
        let Some(socket) = self.socket.lock().take() else {
            return Err(PlatformError::AlreadyStarted);
        };

        info!(addr = %self.local_addr, "receiver listening");
        axum::serve(socket, self.router.clone())
            .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
            .await?;
        info!("receiver shut down");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), PlatformError> {
        self.shutdown.cancel();
        // Never served: release the socket now.
        drop(self.socket.lock().take());
        Ok(())
    }
}
