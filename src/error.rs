//! Error types for fanout-rs
//!
//! Contract violations (size mismatches, out-of-range history access,
//! transport misuse) are returned to the caller. Failures inside callbacks
//! and actions never surface here; they are caught and logged at the
//! dispatch boundary.

use std::fmt;
use std::io;

use crate::registry::HubError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or OS level failure
    Io(io::Error),
    /// Record encode/decode failure
    Record(RecordError),
    /// Hub or history access failure
    Hub(HubError),
    /// Transport used outside its contract
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Record(e) => write!(f, "Record error: {}", e),
            Error::Hub(e) => write!(f, "Hub error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Record(e) => Some(e),
            Error::Hub(e) => Some(e),
            Error::Transport(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<RecordError> for Error {
    fn from(e: RecordError) -> Self {
        Error::Record(e)
    }
}

impl From<HubError> for Error {
    fn from(e: HubError) -> Self {
        Error::Hub(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

/// Record layout errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The typed value does not have the record's declared size
    SizeMismatch { expected: usize, actual: usize },
    /// No record has been published yet
    Empty,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::SizeMismatch { expected, actual } => write!(
                f,
                "Record size mismatch: expected {} bytes, got {}",
                expected, actual
            ),
            RecordError::Empty => write!(f, "No record available"),
        }
    }
}

impl std::error::Error for RecordError {}

/// Transport misuse errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Operation requires an established connection
    NotConnected,
    /// Background loops are already running
    AlreadyStarted,
    /// No remote address given and none remembered
    NoRemote,
    /// host:port did not resolve to any address
    Resolve(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotConnected => write!(f, "Not connected"),
            TransportError::AlreadyStarted => write!(f, "Already started"),
            TransportError::NoRemote => write!(f, "No remote address"),
            TransportError::Resolve(target) => write!(f, "Could not resolve {}", target),
        }
    }
}

impl std::error::Error for TransportError {}
