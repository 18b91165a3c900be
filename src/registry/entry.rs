//! Subscription entries and the notification action
//!
//! This module defines the per-subscriber state stored in the hub.

use std::sync::Arc;

use crate::dispatch::{Action, Dispatcher};

use super::record::Record;

/// Callback run on the subscriber's dispatcher for each published record
pub type RecordCallback = Arc<dyn Fn(&Record) + Send + Sync>;

/// Entry for a single subscriber in the hub
#[derive(Clone)]
pub struct Subscription {
    /// Dispatcher whose queue receives notifications
    pub dispatcher: Arc<Dispatcher>,

    /// Callback invoked with each record
    pub callback: RecordCallback,
}

impl Subscription {
    /// Create a new subscription entry
    pub fn new(dispatcher: Arc<Dispatcher>, callback: RecordCallback) -> Self {
        Self {
            dispatcher,
            callback,
        }
    }

    /// Queue a notification for `record` and wake the dispatcher
    pub(super) fn notify(&self, record: Record) {
        self.dispatcher.enqueue(Box::new(NotifyAction {
            callback: Arc::clone(&self.callback),
            record,
        }));
        self.dispatcher.wake();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("dispatcher", &self.dispatcher.identity())
            .finish_non_exhaustive()
    }
}

/// Delivers one record to one subscriber callback
struct NotifyAction {
    callback: RecordCallback,
    record: Record,
}

impl Action for NotifyAction {
    fn run(self: Box<Self>) {
        (self.callback)(&self.record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_notify_queues_one_action() {
        let dispatcher = Arc::new(Dispatcher::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        let callback: RecordCallback = Arc::new(move |r: &Record| {
            s.lock().unwrap().push(r.clone());
        });
        let subscription = Subscription::new(Arc::clone(&dispatcher), callback);

        subscription.notify(Record::from_bytes(&b"ab"[..]));
        assert_eq!(dispatcher.pending(), 1);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_notify_action_runs_callback() {
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);

        let action: Box<dyn Action> = Box::new(NotifyAction {
            callback: Arc::new(move |r: &Record| *s.lock().unwrap() = Some(r.len())),
            record: Record::from_bytes(&b"xyz"[..]),
        });
        action.run();

        assert_eq!(*seen.lock().unwrap(), Some(3));
    }
}
