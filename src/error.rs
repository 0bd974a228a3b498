//! Error types for the item bank merge engine

use std::fmt;
use thiserror::Error;

/// Result type alias for merge operations
pub type Result<T> = std::result::Result<T, MergeError>;

/// Which collection an index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Existing,
    Incoming,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Existing => write!(f, "existing"),
            Side::Incoming => write!(f, "incoming"),
        }
    }
}

/// Main error type for merge operations
///
/// Detection and resolution are total; these only surface for caller
/// misuse of `execute`.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Unknown merge strategy: {0}")]
    UnknownStrategy(String),

    #[error("Stale preview: {0}")]
    StalePreview(String),

    #[error("{side} index {index} out of range for collection of {len} items")]
    IndexOutOfRange { side: Side, index: usize, len: usize },
}

impl MergeError {
    /// Stable numeric error code
    pub fn code(&self) -> i64 {
        match self {
            MergeError::UnknownStrategy(_) => -32602,
            MergeError::StalePreview(_) => -32010,
            MergeError::IndexOutOfRange { .. } => -32011,
        }
    }
}
