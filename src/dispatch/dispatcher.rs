//! Dispatcher: one worker thread draining a private action queue

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender, TryRecvError, TrySendError};

use crate::error::Result;
use crate::event::multicast::panic_message;
use crate::stats::DispatcherStats;

use super::action::Action;
use super::config::{DispatcherConfig, QueuePolicy};

static NEXT_DISPATCHER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable dispatcher handle, issued at construction
///
/// Independent of the worker thread, so it survives stop/start cycles and
/// is never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatcherId(u64);

impl DispatcherId {
    fn next() -> Self {
        Self(NEXT_DISPATCHER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DispatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatcher-{}", self.0)
    }
}

/// Lifecycle of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Constructed, never started
    Idle,
    /// Worker thread is draining the queue
    Running,
    /// Worker joined; the queue still accepts actions
    Stopped,
}

/// State shared with the worker thread
///
/// The dispatcher holds both ends of the action channel, so it never
/// disconnects and actions accumulate while no worker is running.
struct Shared {
    action_tx: Sender<Box<dyn Action>>,
    action_rx: Receiver<Box<dyn Action>>,
    worker_thread: Mutex<Option<ThreadId>>,
    executed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

struct Lifecycle {
    state: DispatcherState,
    handle: Option<JoinHandle<()>>,
    // Dropping this disconnects the running worker's stop channel
    stop_tx: Option<Sender<()>>,
}

/// Single-worker consumer of queued actions
///
/// Actions enqueued by one producer run in the order they were enqueued.
/// Enqueuing while idle or stopped is allowed: the queue accumulates until
/// the next `start`.
pub struct Dispatcher {
    id: DispatcherId,
    config: DispatcherConfig,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl Dispatcher {
    /// Create an idle dispatcher with default configuration
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create an idle dispatcher with custom configuration
    pub fn with_config(config: DispatcherConfig) -> Self {
        let (action_tx, action_rx) = match config.queue_policy.limit() {
            Some(limit) => bounded(limit),
            None => unbounded(),
        };

        Self {
            id: DispatcherId::next(),
            config,
            shared: Arc::new(Shared {
                action_tx,
                action_rx,
                worker_thread: Mutex::new(None),
                executed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
            lifecycle: Mutex::new(Lifecycle {
                state: DispatcherState::Idle,
                handle: None,
                stop_tx: None,
            }),
        }
    }

    /// Subscription key for this dispatcher
    pub fn identity(&self) -> DispatcherId {
        self.id
    }

    /// OS thread of the running worker, if any
    pub fn thread_id(&self) -> Option<ThreadId> {
        *self
            .shared
            .worker_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the dispatcher configuration
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> DispatcherState {
        self.lifecycle().state
    }

    /// Append an action to the tail of the queue
    ///
    /// A worker parked on an empty queue is woken by the send itself.
    pub fn enqueue(&self, action: Box<dyn Action>) {
        match self.config.queue_policy {
            QueuePolicy::Unbounded => {
                if self.shared.action_tx.send(action).is_err() {
                    self.record_drop();
                }
            }
            QueuePolicy::DropNewest(_) => match self.shared.action_tx.try_send(action) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                    self.record_drop();
                }
            },
            QueuePolicy::DropOldest(_) => {
                let mut action = action;
                loop {
                    match self.shared.action_tx.try_send(action) {
                        Ok(()) => break,
                        Err(TrySendError::Full(rejected)) => {
                            action = rejected;
                            // The worker may have freed a slot meanwhile; retry either way
                            if self.shared.action_rx.try_recv().is_ok() {
                                self.record_drop();
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            self.record_drop();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Append several actions, preserving their order
    pub fn enqueue_many<I>(&self, actions: I)
    where
        I: IntoIterator<Item = Box<dyn Action>>,
    {
        for action in actions {
            self.enqueue(action);
        }
    }

    /// Enqueue an action and wake the worker
    pub fn invoke<A: Action>(&self, action: A) {
        self.enqueue(Box::new(action));
        self.wake();
    }

    /// Signal the worker if it is running and work is pending
    ///
    /// Enqueuing already unparks a waiting worker; this only reports the
    /// backlog.
    pub fn wake(&self) {
        if self.state() != DispatcherState::Running {
            return;
        }
        let pending = self.pending();
        if pending > 0 {
            tracing::trace!(dispatcher = %self.id, pending, "Dispatcher woken");
        }
    }

    /// Number of queued actions
    pub fn pending(&self) -> usize {
        self.shared.action_rx.len()
    }

    /// Spawn the worker thread
    ///
    /// Does nothing if already running. A stopped dispatcher may be
    /// started again; it resumes with whatever accumulated in the queue.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state == DispatcherState::Running {
            return Ok(());
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let wait_timeout = self.config.wait_timeout;
        let id = self.id;
        let spawned = thread::Builder::new()
            .name(self.config.name.clone())
            .spawn(move || run_worker(id, shared, stop_rx, wait_timeout));

        match spawned {
            Ok(handle) => {
                lifecycle.handle = Some(handle);
                lifecycle.stop_tx = Some(stop_tx);
                lifecycle.state = DispatcherState::Running;
                tracing::info!(dispatcher = %self.id, name = %self.config.name, "Dispatcher started");
                Ok(())
            }
            Err(e) => {
                tracing::error!(dispatcher = %self.id, error = %e, "Failed to spawn dispatcher worker");
                Err(e.into())
            }
        }
    }

    /// Stop the worker and join it
    ///
    /// Idempotent. The action in flight finishes first; queued actions
    /// stay queued.
    pub fn stop(&self) {
        let (handle, stop_tx) = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state != DispatcherState::Running {
                return;
            }
            lifecycle.state = DispatcherState::Stopped;
            (lifecycle.handle.take(), lifecycle.stop_tx.take())
        };

        drop(stop_tx);

        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                // Stopped from one of its own actions; the loop exits on return
                return;
            }
            if handle.join().is_err() {
                tracing::error!(dispatcher = %self.id, "Dispatcher worker panicked");
            }
        }

        tracing::info!(dispatcher = %self.id, pending = self.pending(), "Dispatcher stopped");
    }

    /// Snapshot of the dispatcher counters
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            executed: self.shared.executed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
            pending: self.pending(),
        }
    }

    fn record_drop(&self) {
        let dropped = self.shared.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(dispatcher = %self.id, dropped, "Dispatcher queue full, action dropped");
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}

fn run_worker(
    id: DispatcherId,
    shared: Arc<Shared>,
    stop_rx: Receiver<()>,
    wait_timeout: Duration,
) {
    *shared
        .worker_thread
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());

    tracing::debug!(dispatcher = %id, "Dispatcher worker running");

    loop {
        // Stop takes priority over queued work
        if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
            break;
        }

        let keep_running = select! {
            recv(stop_rx) -> _ => false,
            recv(shared.action_rx) -> action => match action {
                Ok(action) => {
                    execute(id, &shared, action);
                    true
                }
                Err(_) => false,
            },
            default(wait_timeout) => true,
        };
        if !keep_running {
            break;
        }
    }

    let mut worker_thread = shared
        .worker_thread
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if *worker_thread == Some(thread::current().id()) {
        *worker_thread = None;
    }
    drop(worker_thread);

    tracing::debug!(dispatcher = %id, "Dispatcher worker exited");
}

fn execute(id: DispatcherId, shared: &Shared, action: Box<dyn Action>) {
    match panic::catch_unwind(AssertUnwindSafe(move || action.run())) {
        Ok(()) => {
            shared.executed.fetch_add(1, Ordering::Relaxed);
        }
        Err(payload) => {
            shared.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                dispatcher = %id,
                panic = %panic_message(payload.as_ref()),
                "Action panicked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Box<dyn Action> {
        let log = Arc::clone(log);
        Box::new(move || log.lock().unwrap().push(value))
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for dispatcher");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_fifo_after_start() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.enqueue(recorder(&log, 1));
        dispatcher.enqueue(recorder(&log, 2));
        dispatcher.enqueue(recorder(&log, 3));
        assert_eq!(dispatcher.state(), DispatcherState::Idle);
        assert_eq!(dispatcher.pending(), 3);

        dispatcher.start().unwrap();
        wait_for(|| log.lock().unwrap().len() == 3);

        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        dispatcher.stop();
    }

    #[test]
    fn test_stop_enqueue_start_drains() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.start().unwrap();
        dispatcher.stop();
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);

        dispatcher.enqueue_many(vec![recorder(&log, 10), recorder(&log, 11)]);
        thread::sleep(Duration::from_millis(20));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(dispatcher.pending(), 2);

        dispatcher.start().unwrap();
        wait_for(|| log.lock().unwrap().len() == 2);

        assert_eq!(*log.lock().unwrap(), vec![10, 11]);
    }

    #[test]
    fn test_panicking_action_does_not_kill_worker() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher.start().unwrap();

        dispatcher.invoke(|| panic!("faulty consumer"));
        dispatcher.enqueue(recorder(&log, 7));

        wait_for(|| log.lock().unwrap().len() == 1);
        let stats = dispatcher.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.executed, 1);
    }

    #[test]
    fn test_runs_on_worker_thread() {
        let dispatcher = Dispatcher::with_config(DispatcherConfig::default().name("worker-a"));
        let (tx, rx) = mpsc::channel();

        assert!(dispatcher.thread_id().is_none());
        dispatcher.start().unwrap();

        dispatcher.invoke(move || {
            let current = thread::current();
            tx.send((current.id(), current.name().map(str::to_string)))
                .unwrap();
        });

        let (thread_id, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(thread_id, thread::current().id());
        assert_eq!(name.as_deref(), Some("worker-a"));
        assert_eq!(dispatcher.thread_id(), Some(thread_id));
    }

    #[test]
    fn test_identity_is_stable_and_unique() {
        let a = Dispatcher::new();
        let b = Dispatcher::new();
        let before = a.identity();

        a.start().unwrap();
        a.stop();
        a.start().unwrap();

        assert_eq!(a.identity(), before);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let dispatcher = Dispatcher::new();

        dispatcher.stop();
        assert_eq!(dispatcher.state(), DispatcherState::Idle);

        dispatcher.start().unwrap();
        dispatcher.stop();
        dispatcher.stop();
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    }

    #[test]
    fn test_stop_wakes_idle_worker_promptly() {
        let dispatcher = Dispatcher::new();
        dispatcher.start().unwrap();

        let started = Instant::now();
        dispatcher.stop();

        // Well under the 5 second idle timeout
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_repeated_start_stop_never_waits_out_idle_timeout() {
        let dispatcher = Dispatcher::with_config(
            DispatcherConfig::default().wait_timeout(Duration::from_secs(30)),
        );

        let started = Instant::now();
        for _ in 0..500 {
            dispatcher.start().unwrap();
            dispatcher.stop();
        }

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    }

    #[test]
    fn test_stop_from_inside_action() {
        let dispatcher = Arc::new(Dispatcher::new());
        let (tx, rx) = mpsc::channel();
        dispatcher.start().unwrap();

        let inner = Arc::clone(&dispatcher);
        dispatcher.invoke(move || {
            inner.stop();
            tx.send(()).unwrap();
        });

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    }

    #[test]
    fn test_restart_after_stop_from_inside_action() {
        let dispatcher = Arc::new(Dispatcher::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel();
        dispatcher.start().unwrap();

        let inner = Arc::clone(&dispatcher);
        dispatcher.invoke(move || {
            inner.stop();
            tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(20));
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        dispatcher.start().unwrap();
        for v in 0..50 {
            dispatcher.enqueue(recorder(&log, v));
        }

        wait_for(|| log.lock().unwrap().len() == 50);
        assert_eq!(*log.lock().unwrap(), (0..50).collect::<Vec<_>>());
        dispatcher.stop();
    }

    #[test]
    fn test_drop_oldest_policy() {
        let dispatcher = Dispatcher::with_config(
            DispatcherConfig::default().queue_policy(QueuePolicy::DropOldest(2)),
        );
        let log = Arc::new(Mutex::new(Vec::new()));

        for v in 1..=4 {
            dispatcher.enqueue(recorder(&log, v));
        }
        assert_eq!(dispatcher.stats().dropped, 2);

        dispatcher.start().unwrap();
        wait_for(|| log.lock().unwrap().len() == 2);
        assert_eq!(*log.lock().unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_drop_newest_policy() {
        let dispatcher = Dispatcher::with_config(
            DispatcherConfig::default().queue_policy(QueuePolicy::DropNewest(2)),
        );
        let log = Arc::new(Mutex::new(Vec::new()));

        for v in 1..=4 {
            dispatcher.enqueue(recorder(&log, v));
        }

        dispatcher.start().unwrap();
        wait_for(|| log.lock().unwrap().len() == 2);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
        assert_eq!(dispatcher.stats().dropped, 2);
    }

    #[test]
    fn test_wake_on_idle_dispatcher_is_noop() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher.enqueue(recorder(&log, 1));

        dispatcher.wake();

        assert_eq!(dispatcher.pending(), 1);
        assert!(log.lock().unwrap().is_empty());
    }
}
