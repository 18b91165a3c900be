//! TCP server
//!
//! Accepts connections and feeds every chunk read from any session into one
//! [`Multicast<Bytes>`](crate::event::Multicast). No framing is applied:
//! handlers see whatever each read returned.

pub mod config;
pub mod listener;
pub(crate) mod session;

pub use config::TcpServerConfig;
pub use listener::TcpServer;
