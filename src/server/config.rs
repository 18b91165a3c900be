//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};

/// Default per-session receive buffer size
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1024;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent sessions (0 = unlimited)
    pub max_connections: usize,

    /// Size of each session's reusable read buffer
    pub recv_buffer_size: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            max_connections: 0, // Unlimited
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            tcp_nodelay: true,
        }
    }
}

impl TcpServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Create a config listening on all IPv4 interfaces at `port`
    pub fn with_port(port: u16) -> Self {
        Self::with_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the receive buffer size
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size.max(1);
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
        let config = TcpServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.recv_buffer_size, DEFAULT_RECV_BUFFER_SIZE);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_port() {
        let config = TcpServerConfig::with_port(9000);

        assert_eq!(config.bind_addr.port(), 9000);
        assert!(config.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let config = TcpServerConfig::default()
            .bind(addr)
            .max_connections(4)
            .recv_buffer_size(0)
            .tcp_nodelay(false);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 4);
        // Zero-length reads would look like EOF; floor is one byte
        assert_eq!(config.recv_buffer_size, 1);
        assert!(!config.tcp_nodelay);
    }
}
