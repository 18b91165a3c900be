//! Client configuration

use std::time::Duration;

use crate::server::config::DEFAULT_RECV_BUFFER_SIZE;

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote host name or IP
    pub host: String,

    /// Remote port
    pub port: u16,

    /// Size of the reusable receive buffer
    pub recv_buffer_size: usize,

    /// Enable TCP_NODELAY
    pub tcp_nodelay: bool,

    /// Connection timeout
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a config for `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            tcp_nodelay: true,
            connect_timeout: Duration::from_secs(10),
        }
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

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `host:port` as a display string
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let config = ClientConfig::new("localhost", 8080);

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert_eq!(config.recv_buffer_size, DEFAULT_RECV_BUFFER_SIZE);
        assert!(config.tcp_nodelay);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.target(), "localhost:8080");
    }

    #[test]
    fn test_builder_chaining() {
        let config = ClientConfig::new("127.0.0.1", 1)
            .recv_buffer_size(4096)
            .tcp_nodelay(false)
            .connect_timeout(Duration::from_millis(250));

        assert_eq!(config.recv_buffer_size, 4096);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
    }
}
