//! Orchestrator and subagent-coordinator error types.

use thiserror::Error;

/// Errors returned by orchestrator commands (spec §4.5, §7).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// `prompt` was sent while a run was already streaming.
    #[error("already streaming")]
    AlreadyStreaming,

    /// `compact` found no valid cut-point and was not forced.
    #[error("cannot compact: no valid cut-point")]
    CannotCompact,

    /// `navigate_tree` targeted an id not present in the session log.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// `summarize_current_branch` was called on a branch with no
    /// context-bearing entries.
    #[error("branch has no message entries to summarize")]
    EmptyBranch,

    /// The underlying `SessionDriver` returned an error.
    #[error("driver error: {0}")]
    Driver(String),

    /// The session log rejected a write.
    #[error("session log error: {0}")]
    Log(#[from] astrid_session::SessionLogError),

    /// Compaction failed.
    #[error("compaction error: {0}")]
    Compaction(#[from] astrid_compaction::CompactionError),

    /// The actor's mailbox is gone (the orchestrator task has exited).
    #[error("orchestrator actor is no longer running")]
    ActorGone,

    /// A bounded wait (idle, deadline) elapsed.
    #[error("timed out waiting for {0}")]
    Timeout(String),
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Status of one subagent run, returned by [`crate::subagent::run_subagents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubagentStatus {
    /// The child session reached `agent_end` before the deadline.
    Completed,
    /// The child session emitted an `error` event, or its monitor reported
    /// it went down unexpectedly.
    Error,
    /// The shared deadline elapsed before the child finished.
    Timeout,
    /// The coordinator aborted the child (e.g. another child's failure
    /// triggered a cancel-all, if the caller wires one up).
    Aborted,
}
