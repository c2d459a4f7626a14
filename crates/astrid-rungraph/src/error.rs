//! Run graph error types.

use thiserror::Error;

use crate::record::RunStatus;

/// Errors returned by run graph operations.
#[derive(Debug, Error)]
pub enum RunGraphError {
    /// No record exists for the given id.
    #[error("run not found: {0}")]
    NotFound(String),

    /// The requested status transition is not permitted from the record's
    /// current status.
    #[error("invalid transition for {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        /// The run id.
        id: String,
        /// Current status.
        from: RunStatus,
        /// Attempted target status.
        to: RunStatus,
    },

    /// `await` deadline passed before the wait condition was satisfied.
    #[error("timed out waiting on {0:?}")]
    Timeout(Vec<String>),

    /// The disk-backed store failed to read or write.
    #[error("store error: {0}")]
    Store(String),

    /// The writer actor's mailbox was dropped (process shutting down).
    #[error("run graph writer is gone")]
    WriterGone,
}

/// Result type for run graph operations.
pub type RunGraphResult<T> = Result<T, RunGraphError>;
