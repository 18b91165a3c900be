//! Lifecycle trait for consumers built around a dispatcher

use std::sync::Arc;

use crate::error::Result;
use crate::registry::{Hub, Record};

use super::dispatcher::Dispatcher;

/// A consumer that owns a dispatcher
///
/// Implementors set up their subscriptions in `init`, then `start` and
/// `stop` drive the dispatcher.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use fanout_rs::dispatch::{Dispatcher, Worker};
/// use fanout_rs::registry::Hub;
///
/// struct Printer {
///     dispatcher: Arc<Dispatcher>,
///     hub: Arc<Hub>,
/// }
///
/// impl Worker for Printer {
///     fn dispatcher(&self) -> &Arc<Dispatcher> {
///         &self.dispatcher
///     }
///
///     fn init(&mut self) -> fanout_rs::Result<()> {
///         let hub = Arc::clone(&self.hub);
///         self.subscribe(&hub, |record| println!("{} bytes", record.len()));
///         Ok(())
///     }
/// }
///
/// let mut printer = Printer {
///     dispatcher: Arc::new(Dispatcher::new()),
///     hub: Arc::new(Hub::new(4)),
/// };
/// printer.init().unwrap();
/// printer.start().unwrap();
/// printer.stop();
/// ```
pub trait Worker {
    /// The dispatcher this worker runs on
    fn dispatcher(&self) -> &Arc<Dispatcher>;

    /// One-time setup, typically subscriptions
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Start the dispatcher
    fn start(&self) -> Result<()> {
        self.dispatcher().start()
    }

    /// Stop the dispatcher
    fn stop(&self) {
        self.dispatcher().stop()
    }

    /// Subscribe this worker's dispatcher to `hub`
    fn subscribe<F>(&self, hub: &Hub, callback: F) -> bool
    where
        F: Fn(&Record) + Send + Sync + 'static,
    {
        hub.subscribe(self.dispatcher(), callback)
    }
}
