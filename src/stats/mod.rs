//! Counters for dispatchers and transports

pub mod metrics;

pub use metrics::{DispatcherStats, TransportStats};
pub(crate) use metrics::TransportCounters;
