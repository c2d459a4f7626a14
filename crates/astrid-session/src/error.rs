/// Errors returned by the branching session log.
#[derive(Debug, thiserror::Error)]
pub enum SessionLogError {
    /// `get`/`set_leaf`/`branch` referenced an id not present in the log.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// `append` was given a `parent_id` that does not exist.
    #[error("parent entry not found: {0}")]
    ParentNotFound(String),

    /// Random id generation could not find a free 8-hex slot.
    #[error("exhausted id space generating a unique entry id")]
    IdSpaceExhausted,

    /// The on-disk log file could not be read or parsed.
    #[error("failed to load session log from {path}: {message}")]
    LoadFailed {
        /// Path that failed to load.
        path: String,
        /// Underlying error text.
        message: String,
    },

    /// The on-disk log file could not be written.
    #[error("failed to save session log to {path}: {message}")]
    SaveFailed {
        /// Path that failed to save.
        path: String,
        /// Underlying error text.
        message: String,
    },

    /// The header declared a version newer than this implementation knows
    /// how to migrate from.
    #[error("unsupported session log version {0}")]
    UnsupportedVersion(u32),
}

/// Result type for branching session log operations.
pub type SessionLogResult<T> = Result<T, SessionLogError>;
