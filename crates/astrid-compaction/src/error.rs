//! Compaction error types.

use thiserror::Error;

/// Errors returned by compaction operations (spec §4.6, §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompactionError {
    /// No valid cut-point exists and the caller did not pass `force=true`.
    #[error("cannot compact: no valid cut-point")]
    CannotCompact,

    /// The caller's abort signal fired while compaction was suspended
    /// (summarization in flight, etc).
    #[error("compaction aborted")]
    Aborted,

    /// Summarization itself failed (the external summarizer returned an
    /// error or panicked).
    #[error("summarization failed: {0}")]
    SummarizationFailed(String),

    /// Appending the resulting compaction entry to the session log failed.
    #[error("failed to apply compaction: {0}")]
    LogError(String),
}

/// Result type for compaction operations.
pub type CompactionResult<T> = Result<T, CompactionError>;
