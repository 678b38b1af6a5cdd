//! Chat server listener
//!
//! Handles the TCP accept loop and spawns one worker task per connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::error::Result;
use crate::registry::RoomRegistry;
use crate::server::config::ServerConfig;
use crate::server::worker::{Worker, WorkerContext};
use crate::stats::{ServerMetrics, ServerStats};

/// First retry delay after a failed accept
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);

/// Longest retry delay between failed accepts
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Delay before the next accept after `failures` consecutive failures
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Chat server
pub struct ChatServer {
    config: ServerConfig,
    registry: Arc<RoomRegistry>,
    metrics: Arc<ServerMetrics>,
    next_session_id: AtomicU64,
    shutdown_tx: watch::Sender<bool>,
}

impl ChatServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            registry: Arc::new(RoomRegistry::new()),
            metrics: Arc::new(ServerMetrics::new()),
            next_session_id: AtomicU64::new(1),
            shutdown_tx,
        }
    }

    /// Get a reference to the room registry
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Current server statistics
    pub fn stats(&self) -> ServerStats {
        self.metrics.snapshot()
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind and run the server
    ///
    /// This method blocks until the listener fails to bind.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already-bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "Chat server listening");
        self.accept_loop(&listener).await
    }

    /// Bind and run the server until `shutdown` resolves
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Accept connections on `listener` until `shutdown` resolves
    ///
    /// On shutdown the listener is dropped and subscriber workers are told
    /// to leave their rooms; publishers finish on their own.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tracing::info!(addr = %listener.local_addr()?, "Chat server listening");

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        };

        self.shutdown();
        result
    }

    /// Signal all subscriber workers to stop
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        let mut failures = 0u32;

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    failures = 0;
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = accept_backoff(failures);
                    tracing::error!(
                        error = %e,
                        failures = failures,
                        retry_ms = delay.as_millis() as u64,
                        "Failed to accept connection"
                    );
                    // Errors such as EMFILE persist until some socket closes
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(session_id = session_id, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let ctx = WorkerContext {
            registry: Arc::clone(&self.registry),
            metrics: Arc::clone(&self.metrics),
            dequeue_timeout: self.config.dequeue_timeout,
            shutdown: self.shutdown_tx.subscribe(),
        };
        let metrics = Arc::clone(&self.metrics);
        metrics.connection_opened();

        tokio::spawn(async move {
            let worker = Worker::new(session_id, peer_addr, socket, ctx);

            if let Err(e) = worker.run().await {
                tracing::debug!(
                    session_id = session_id,
                    error = %e,
                    "Connection error"
                );
            }

            metrics.connection_closed();
        });
    }
}
