//! Thread-safe multicast of a value to registered callbacks

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A registered callback
///
/// The `Arc` returned from [`Multicast::add`] is the registration's identity:
/// pass it back to [`Multicast::remove`] to unregister.
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Ordered set of callbacks invoked synchronously in registration order
///
/// Registration, removal and invocation share one lock. A callback must not
/// call back into the same `Multicast` (that would deadlock).
pub struct Multicast<T: ?Sized> {
    handlers: Mutex<Vec<Handler<T>>>,
}

impl<T: ?Sized> Multicast<T> {
    /// Create an empty multicast
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Append a closure, returning its handle
    pub fn add<F>(&self, f: F) -> Handler<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let handler: Handler<T> = Arc::new(f);
        self.add_handler(Arc::clone(&handler));
        handler
    }

    /// Append an already shared handler
    ///
    /// The same handler may be registered more than once; it is then
    /// invoked once per registration.
    pub fn add_handler(&self, handler: Handler<T>) {
        self.lock().push(handler);
    }

    /// Remove every registration of `handler`
    ///
    /// Returns false if it was not registered.
    pub fn remove(&self, handler: &Handler<T>) -> bool {
        let mut handlers = self.lock();
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        handlers.len() != before
    }

    /// Call every registered handler with `value`
    ///
    /// Runs on the caller's thread. A panicking handler is logged and
    /// skipped; the remaining handlers still run.
    pub fn invoke(&self, value: &T) {
        let handlers = self.lock();

        for (index, handler) in handlers.iter().enumerate() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(value))) {
                tracing::error!(
                    handler = index,
                    panic = %panic_message(payload.as_ref()),
                    "Multicast handler panicked"
                );
            }
        }
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all registrations
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Handler<T>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ?Sized> Default for Multicast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Multicast<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multicast")
            .field("handlers", &self.len())
            .finish()
    }
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
