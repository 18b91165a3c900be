//! TCP clients
//!
//! Two flavours:
//! - [`TcpClient`]: connects once, then a background receive loop feeds
//!   every chunk into a [`Multicast<Bytes>`](crate::event::Multicast)
//! - [`BlockingTcpClient`]: explicit connect/disconnect with send and
//!   receive blocking the calling thread

pub mod blocking;
pub mod config;
pub mod connector;

pub use blocking::BlockingTcpClient;
pub use config::ClientConfig;
pub use connector::TcpClient;
