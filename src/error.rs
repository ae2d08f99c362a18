//! Error types for divsearch.

use thiserror::Error;

/// Result type alias for divsearch operations.
pub type Result<T> = std::result::Result<T, DivisorError>;

/// Errors that can occur while partitioning, scanning, or exchanging results.
///
/// Every variant is fatal to the run. A zero result is not an error.
#[derive(Error, Debug)]
pub enum DivisorError {
    /// Worker (or process) count of zero
    #[error("worker count must be a positive integer, got {0}")]
    InvalidWorkerCount(usize),

    /// Configuration rejected before any work started
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Value does not fit the provisioned limb buffer
    #[error("value needs {needed} limbs but the buffer holds {capacity}")]
    CapacityExceeded { needed: usize, capacity: usize },

    /// Peer provisioned a buffer of a different width
    #[error("limb buffer capacity mismatch: expected {expected}, got {actual}")]
    CapacityMismatch { expected: usize, actual: usize },

    /// I/O or channel failure during a collective
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unexpected message or version mismatch
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Another participant aborted the run
    #[error("Run aborted: {0}")]
    Aborted(String),

    /// A scan thread panicked before writing its slot
    #[error("worker thread {0} panicked")]
    WorkerPanicked(usize),
}

impl From<std::io::Error> for DivisorError {
    fn from(e: std::io::Error) -> Self {
        DivisorError::Transport(e.to_string())
    }
}
