//! Single-thread-per-consumer work dispatch
//!
//! A [`Dispatcher`] owns one worker thread and a private FIFO of
//! [`Action`]s. Producers enqueue from any thread; the worker pops and runs
//! each action on its own thread, at its own pace.
//!
//! ```text
//!   producer A ──┐
//!                ├──► enqueue() ──► [ channel<Box<dyn Action>> ] ──► worker thread
//!   producer B ──┘                                                      ▲
//!                       stop() ──► [ stop channel ] ────────────────────┘
//!                                  (idle select wakes every 5s)
//! ```

pub mod action;
pub mod config;
pub mod dispatcher;
pub mod worker;

pub use action::Action;
pub use config::{DispatcherConfig, QueuePolicy};
pub use dispatcher::{Dispatcher, DispatcherId, DispatcherState};
pub use worker::Worker;
