//! Server-wide counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters shared by the accept loop and all workers
#[derive(Debug)]
pub struct ServerMetrics {
    started_at: Instant,
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    publisher_logins: AtomicU64,
    subscriber_logins: AtomicU64,
    broadcasts: AtomicU64,
    deliveries_sent: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            publisher_logins: AtomicU64::new(0),
            subscriber_logins: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            deliveries_sent: AtomicU64::new(0),
        }
    }

    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn publisher_login(&self) {
        self.publisher_logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_login(&self) {
        self.subscriber_logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_sent(&self) {
        self.deliveries_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            publisher_logins: self.publisher_logins.load(Ordering::Relaxed),
            subscriber_logins: self.subscriber_logins.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries_sent: self.deliveries_sent.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Total connections ever
    pub total_connections: u64,
    /// Current active connections
    pub active_connections: u64,
    /// Successful `slogin`s
    pub publisher_logins: u64,
    /// Successful `rlogin`s
    pub subscriber_logins: u64,
    /// `sendall` commands accepted
    pub broadcasts: u64,
    /// Deliveries written to subscriber connections
    pub deliveries_sent: u64,
    /// Uptime
    pub uptime: Duration,
}
