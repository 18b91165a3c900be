//! Statistics snapshots for dispatchers and transports

use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatcher-level statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Actions that ran to completion
    pub executed: u64,
    /// Actions that panicked
    pub failed: u64,
    /// Actions discarded by the queue policy
    pub dropped: u64,
    /// Actions waiting in the queue
    pub pending: usize,
}

impl DispatcherStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total actions taken off the queue
    pub fn processed(&self) -> u64 {
        self.executed + self.failed
    }
}

/// Transport-level statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Connections ever accepted or established
    pub total_connections: u64,
    /// Connections currently open
    pub active_connections: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Reads (TCP) or datagrams (UDP) delivered to handlers
    pub messages_received: u64,
    /// Writes or datagrams sent
    pub messages_sent: u64,
    /// I/O errors that ended a loop or failed a send
    pub errors: u64,
}

impl TransportStats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Live counters behind a [`TransportStats`] snapshot
#[derive(Debug, Default)]
pub(crate) struct TransportCounters {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
    messages_received: AtomicU64,
    messages_sent: AtomicU64,
    errors: AtomicU64,
}

impl TransportCounters {
    pub(crate) fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub(crate) fn received(&self, bytes: usize) {
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sent(&self, bytes: usize) {
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TransportStats {
        TransportStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
