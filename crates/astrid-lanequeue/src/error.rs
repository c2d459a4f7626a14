//! Lane queue error types.

use thiserror::Error;

/// Errors a lane job can fail with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaneError {
    /// The job's future panicked or the executing task was otherwise lost.
    #[error("lane job crashed: {0}")]
    Crashed(String),

    /// The job did not complete within its timeout.
    #[error("lane job timed out")]
    Timeout,

    /// The job's reply channel was dropped before a result arrived
    /// (scheduler shut down mid-job).
    #[error("lane job cancelled")]
    Cancelled,
}

/// Result type for a lane job outcome.
pub type LaneResult<T> = Result<T, LaneError>;
