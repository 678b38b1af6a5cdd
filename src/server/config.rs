//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::{DEFAULT_DEQUEUE_TIMEOUT, DEFAULT_PORT};

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// How long a subscriber worker waits on its queue before checking for
    /// shutdown and waiting again
    pub dequeue_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            dequeue_timeout: DEFAULT_DEQUEUE_TIMEOUT,
            tcp_nodelay: true, // Deliveries are small and latency-sensitive
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Create a new config listening on all interfaces at `port`
    pub fn with_port(port: u16) -> Self {
        Self::with_addr(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the subscriber queue wait
    pub fn dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.dequeue_timeout = timeout;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.dequeue_timeout, Duration::from_secs(1));
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.dequeue_timeout, DEFAULT_DEQUEUE_TIMEOUT);
    }

    #[test]
    fn test_with_port() {
        let config = ServerConfig::with_port(6000);
        assert_eq!(config.bind_addr.port(), 6000);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .dequeue_timeout(Duration::from_millis(100))
            .tcp_nodelay(false);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.dequeue_timeout, Duration::from_millis(100));
        assert!(!config.tcp_nodelay);
    }
}
