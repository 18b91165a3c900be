//! # fanout-rs
//!
//! In-process publish/subscribe distribution with one worker thread per
//! consumer, fed by locally published records or by bytes arriving over
//! TCP and UDP.
//!
//! ```text
//!   TcpServer / TcpClient / UdpPeer
//!              │ Multicast<Bytes>
//!              ▼
//!        decode closure ──► Hub::write ──► RingHistory
//!                               │
//!               ┌───────────────┼───────────────┐
//!               ▼               ▼               ▼
//!         [Dispatcher]    [Dispatcher]    [Dispatcher]
//!          own thread      own thread      own thread
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::mpsc;
//! use std::time::Duration;
//!
//! use fanout_rs::{Dispatcher, Hub};
//!
//! let hub = Hub::of::<u64>();
//! let dispatcher = Arc::new(Dispatcher::new());
//! dispatcher.start().unwrap();
//!
//! let (tx, rx) = mpsc::channel();
//! let tx = std::sync::Mutex::new(tx);
//! hub.subscribe_typed(&dispatcher, move |value: u64| {
//!     let _ = tx.lock().unwrap().send(value);
//! })
//! .unwrap();
//!
//! hub.write(&42u64).unwrap();
//! assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
//! assert_eq!(hub.get_last::<u64>().unwrap(), 42);
//! dispatcher.stop();
//! ```

pub mod client;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod registry;
pub mod server;
pub mod stats;
pub mod udp;

pub use client::{BlockingTcpClient, ClientConfig, TcpClient};
pub use dispatch::{Action, Dispatcher, DispatcherConfig, DispatcherId, QueuePolicy, Worker};
pub use error::{Error, RecordError, Result, TransportError};
pub use event::{Handler, Multicast};
pub use registry::{FixedLayout, Hub, HubConfig, HubError, Record, RingHistory};
pub use server::{TcpServer, TcpServerConfig};
pub use stats::{DispatcherStats, TransportStats};
pub use udp::{UdpConfig, UdpPeer};
