//! Hub error types

/// Error type for hub and history access
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// History index past the number of held records
    OutOfRange { index: usize, len: usize },
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubError::OutOfRange { index, len } => {
                write!(f, "Index {} out of range for history of {}", index, len)
            }
        }
    }
}

impl std::error::Error for HubError {}
