//! Dispatcher configuration

use std::time::Duration;

/// What `enqueue` does when the queue already holds the bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Never drop; the queue grows with demand
    Unbounded,
    /// Keep at most n actions, discarding the oldest queued one
    DropOldest(usize),
    /// Keep at most n actions, discarding the incoming one
    DropNewest(usize),
}

impl QueuePolicy {
    /// Queue bound, if any
    pub fn limit(&self) -> Option<usize> {
        match *self {
            QueuePolicy::Unbounded => None,
            QueuePolicy::DropOldest(n) | QueuePolicy::DropNewest(n) => Some(n.max(1)),
        }
    }
}

impl Default for QueuePolicy {
    fn default() -> Self {
        QueuePolicy::Unbounded
    }
}

/// Dispatcher configuration options
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Worker thread name
    pub name: String,

    /// Longest the idle worker sleeps before re-checking its liveness flag
    pub wait_timeout: Duration,

    /// Queue overflow policy
    pub queue_policy: QueuePolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "fanout-dispatcher".to_string(),
            wait_timeout: Duration::from_secs(5),
            queue_policy: QueuePolicy::Unbounded,
        }
    }
}

impl DispatcherConfig {
    /// Set the worker thread name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the idle wait timeout
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Set the queue overflow policy
    pub fn queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatcherConfig::default();

        assert_eq!(config.name, "fanout-dispatcher");
        assert_eq!(config.wait_timeout, Duration::from_secs(5));
        assert_eq!(config.queue_policy, QueuePolicy::Unbounded);
    }

    #[test]
    fn test_builder_chaining() {
        let config = DispatcherConfig::default()
            .name("consumer-1")
            .wait_timeout(Duration::from_millis(50))
            .queue_policy(QueuePolicy::DropOldest(16));

        assert_eq!(config.name, "consumer-1");
        assert_eq!(config.wait_timeout, Duration::from_millis(50));
        assert_eq!(config.queue_policy, QueuePolicy::DropOldest(16));
    }

    #[test]
    fn test_policy_limit() {
        assert_eq!(QueuePolicy::Unbounded.limit(), None);
        assert_eq!(QueuePolicy::DropNewest(4).limit(), Some(4));
        // A zero bound would drop everything; it is clamped to one
        assert_eq!(QueuePolicy::DropOldest(0).limit(), Some(1));
    }
}
