//! Hub configuration

/// Default number of records kept in history
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Hub configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Exact size in bytes of every record published through the hub
    pub record_size: usize,

    /// Number of most recent records retained
    pub history_capacity: usize,
}

impl HubConfig {
    /// Create a config for records of `record_size` bytes
    pub fn new(record_size: usize) -> Self {
        Self {
            record_size,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Set the history capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }
}
