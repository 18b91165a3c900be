//! Deferred units of work

/// A single-shot unit of deferred work
///
/// `run` consumes the box, so an action executes exactly once.
pub trait Action: Send + 'static {
    /// Execute the action
    fn run(self: Box<Self>);
}

impl<F> Action for F
where
    F: FnOnce() + Send + 'static,
{
    fn run(self: Box<Self>) {
        (*self)()
    }
}
