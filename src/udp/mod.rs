//! UDP peer
//!
//! ```text
//!                 ┌────────────┐  datagrams  ┌──────────────────┐
//!   socket ──────►│  I/O task  │────────────►│ dispatch thread  │──► Multicast<Bytes>
//!                 └────────────┘  (channel)  └──────────────────┘
//!
//!   async_send ──► outbound queue ──► drain task (one write in flight) ──► socket
//! ```
//!
//! Datagram boundaries are preserved: each received datagram becomes
//! exactly one handler invocation. Datagrams longer than the receive
//! buffer are truncated.

pub mod config;
pub mod peer;

pub use config::UdpConfig;
pub use peer::UdpPeer;
