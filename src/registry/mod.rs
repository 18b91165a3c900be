//! Record hub for pub/sub fan-out
//!
//! The hub keeps a short history of published records and routes each new
//! record to every subscribed dispatcher. Delivery goes through the
//! subscriber's own queue, so a slow consumer never stalls the publisher or
//! its siblings.
//!
//! # Architecture
//!
//! ```text
//!                              Arc<Hub>
//!                     ┌─────────────────────────┐
//!                     │ history: RingHistory<   │
//!                     │   Record>               │
//!                     │ subscriptions: BTreeMap<│
//!                     │   DispatcherId,         │
//!                     │   Subscription>         │
//!                     └───────────┬─────────────┘
//!                                 │ write()
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   [Dispatcher 1]          [Dispatcher 2]          [Dispatcher 3]
//!   NotifyAction            NotifyAction            NotifyAction
//!   callback(&record)       callback(&record)       callback(&record)
//! ```
//!
//! # Zero-Copy Design
//!
//! A [`Record`] wraps `bytes::Bytes`, so the history slot and every queued
//! notification share one allocation.

pub mod config;
pub mod entry;
pub mod error;
pub mod history;
pub mod record;
pub mod store;

pub use config::HubConfig;
pub use entry::{RecordCallback, Subscription};
pub use error::HubError;
pub use history::RingHistory;
pub use record::{FixedLayout, Record};
pub use store::Hub;
