//! Hub implementation
//!
//! Owns the record history and the subscription map, and fans each
//! published record out to every subscribed dispatcher.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dispatch::{Dispatcher, DispatcherId};
use crate::error::{RecordError, Result};

use super::config::HubConfig;
use super::entry::{RecordCallback, Subscription};
use super::history::RingHistory;
use super::record::{FixedLayout, Record};

struct HubState {
    history: RingHistory<Record>,
    subscriptions: BTreeMap<DispatcherId, Subscription>,
}

/// Bounded-history publisher
///
/// The record size is fixed at construction. Fan-out order follows
/// dispatcher identity (creation order).
pub struct Hub {
    config: HubConfig,
    state: Mutex<HubState>,
}

impl Hub {
    /// Create a hub for records of `record_size` bytes
    pub fn new(record_size: usize) -> Self {
        Self::with_config(HubConfig::new(record_size))
    }

    /// Create a hub sized for `T`
    pub fn of<T: FixedLayout>() -> Self {
        Self::new(T::SIZE)
    }

    /// Create a hub with custom configuration
    pub fn with_config(config: HubConfig) -> Self {
        let history = RingHistory::with_capacity(config.history_capacity);
        Self {
            config,
            state: Mutex::new(HubState {
                history,
                subscriptions: BTreeMap::new(),
            }),
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Declared record size in bytes
    pub fn record_size(&self) -> usize {
        self.config.record_size
    }

    /// Subscribe a dispatcher
    ///
    /// The first registration for a dispatcher wins: returns false, leaving
    /// the existing callback in place, if it is already subscribed.
    pub fn subscribe<F>(&self, dispatcher: &Arc<Dispatcher>, callback: F) -> bool
    where
        F: Fn(&Record) + Send + Sync + 'static,
    {
        self.subscribe_handler(dispatcher, Arc::new(callback))
    }

    /// Subscribe a dispatcher with a shared callback
    pub fn subscribe_handler(&self, dispatcher: &Arc<Dispatcher>, callback: RecordCallback) -> bool {
        let id = dispatcher.identity();
        let mut state = self.state();

        if state.subscriptions.contains_key(&id) {
            tracing::debug!(dispatcher = %id, "Already subscribed, keeping first registration");
            return false;
        }

        state
            .subscriptions
            .insert(id, Subscription::new(Arc::clone(dispatcher), callback));

        tracing::info!(
            dispatcher = %id,
            subscribers = state.subscriptions.len(),
            "Subscriber added"
        );
        true
    }

    /// Subscribe with a callback that receives decoded values
    ///
    /// Fails if `T` does not match the record size.
    pub fn subscribe_typed<T, F>(&self, dispatcher: &Arc<Dispatcher>, callback: F) -> Result<bool>
    where
        T: FixedLayout + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.check_size::<T>()?;

        Ok(self.subscribe(dispatcher, move |record: &Record| match record.decode::<T>() {
            Ok(value) => callback(value),
            Err(e) => tracing::error!(error = %e, "Failed to decode record"),
        }))
    }

    /// Remove a subscription
    pub fn unsubscribe(&self, id: DispatcherId) -> bool {
        let removed = self.state().subscriptions.remove(&id).is_some();
        if removed {
            tracing::debug!(dispatcher = %id, "Subscriber removed");
        }
        removed
    }

    /// Number of subscribed dispatchers
    pub fn subscriber_count(&self) -> usize {
        self.state().subscriptions.len()
    }

    /// Publish a typed value
    pub fn write<T: FixedLayout>(&self, value: &T) -> Result<()> {
        self.check_size::<T>()?;
        let record = Record::encode(value)?;
        self.write_record(record)
    }

    /// Publish an already-encoded record
    ///
    /// The record joins the history and one notification is queued on every
    /// subscribed dispatcher, stopped ones included.
    pub fn write_record(&self, record: Record) -> Result<()> {
        if record.len() != self.config.record_size {
            return Err(RecordError::SizeMismatch {
                expected: self.config.record_size,
                actual: record.len(),
            }
            .into());
        }

        let targets: Vec<Subscription> = {
            let mut state = self.state();
            state.history.push(record.clone());
            state.subscriptions.values().cloned().collect()
        };

        for subscription in &targets {
            subscription.notify(record.clone());
        }

        tracing::trace!(subscribers = targets.len(), "Record published");
        Ok(())
    }

    /// Most recently published value
    pub fn get_last<T: FixedLayout>(&self) -> Result<T> {
        self.check_size::<T>()?;
        let record = self.state().history.back().cloned().ok_or(RecordError::Empty)?;
        Ok(record.decode()?)
    }

    /// The i-th-oldest value still in history
    pub fn get<T: FixedLayout>(&self, index: usize) -> Result<T> {
        self.check_size::<T>()?;
        let record = self.state().history.at(index)?.clone();
        Ok(record.decode()?)
    }

    /// Snapshot of the history, oldest first
    pub fn history(&self) -> Vec<Record> {
        self.state().history.iter().cloned().collect()
    }

    fn check_size<T: FixedLayout>(&self) -> Result<()> {
        if T::SIZE != self.config.record_size {
            return Err(RecordError::SizeMismatch {
                expected: self.config.record_size,
                actual: T::SIZE,
            }
            .into());
        }
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("record_size", &self.config.record_size)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
