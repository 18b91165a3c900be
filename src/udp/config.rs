//! UDP peer configuration

use std::net::{Ipv4Addr, SocketAddr};

use crate::server::config::DEFAULT_RECV_BUFFER_SIZE;

/// UDP peer configuration options
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Local address to bind
    pub local_addr: SocketAddr,

    /// Default destination for `send` and `async_send`
    pub remote_addr: Option<SocketAddr>,

    /// Receive buffer size; longer datagrams are truncated
    pub recv_buffer_size: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            local_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            remote_addr: None,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
        }
    }
}

impl UdpConfig {
    /// Receive-only peer bound to `addr`
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            local_addr: addr,
            ..Default::default()
        }
    }

    /// Receive-only peer on all IPv4 interfaces at `port`
    pub fn with_port(port: u16) -> Self {
        Self::with_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    /// Set the default remote peer
    pub fn remote(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Set the receive buffer size
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size.max(1);
        self
    }
}
