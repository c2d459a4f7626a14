//! The run record: one node in the process-wide run graph.

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Lifecycle status of a run.
///
/// Transitions are monotonic: `queued -> {running, cancelled, killed}`,
/// `running -> {completed, error, killed, cancelled, lost}`; every other
/// status is a sink. See [`RunStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, not yet dispatched.
    Queued,
    /// Actively executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Error,
    /// Found running at process start; rewritten by the restart sweep.
    Lost,
    /// Killed by an operator or supervisor.
    Killed,
    /// Cancelled before or during execution.
    Cancelled,
}

impl RunStatus {
    /// Whether this status has no further valid transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Error | Self::Lost | Self::Killed | Self::Cancelled
        )
    }

    /// Whether a transition from `self` to `target` is permitted by the
    /// state machine in spec §4.2.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        use RunStatus::{Cancelled, Completed, Error, Killed, Lost, Queued, Running};
        match self {
            Queued => matches!(target, Running | Cancelled | Killed),
            Running => matches!(target, Completed | Error | Killed | Cancelled | Lost),
            Completed | Error | Lost | Killed | Cancelled => false,
        }
    }
}

/// A process-wide run record: one invocation unit with lifecycle state,
/// parent/child links, and accumulated result/error/budget side-data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run id.
    pub id: String,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Parent run id, if this run was spawned as a child.
    #[serde(default)]
    pub parent: Option<String>,
    /// Child run ids, in spawn order.
    #[serde(default)]
    pub children: Vec<String>,
    /// When the record was first written.
    pub inserted_at: TimestampMs,
    /// When the record was last mutated.
    pub updated_at: TimestampMs,
    /// When the run transitioned to `running`.
    #[serde(default)]
    pub started_at: Option<TimestampMs>,
    /// When the run reached a terminal status.
    #[serde(default)]
    pub completed_at: Option<TimestampMs>,
    /// Opaque result payload, set on successful completion.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error description, set on failure/loss/kill/cancel where applicable.
    #[serde(default)]
    pub error: Option<String>,
    /// Opaque budget side-data (owned and shaped by `astrid-budget`).
    #[serde(default)]
    pub budget: Option<serde_json::Value>,
    /// Caller-supplied opaque metadata (session key, lane, etc.).
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl RunRecord {
    /// Construct a fresh queued record.
    #[must_use]
    pub fn new(id: String, parent: Option<String>, now_ms: TimestampMs, meta: serde_json::Value) -> Self {
        Self {
            id,
            status: RunStatus::Queued,
            parent,
            children: Vec::new(),
            inserted_at: now_ms,
            updated_at: now_ms,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            budget: None,
            meta,
        }
    }

    /// The most recent timestamp touching this record (used by TTL cleanup).
    #[must_use]
    pub fn last_touched(&self) -> TimestampMs {
        self.completed_at.unwrap_or(self.updated_at)
    }
}

/// Attributes accepted by [`crate::RunGraph::new_run`].
#[derive(Debug, Clone, Default)]
pub struct NewRunAttrs {
    /// Parent run id, if any.
    pub parent: Option<String>,
    /// Opaque caller metadata (session key, lane, prompt summary, ...).
    pub meta: serde_json::Value,
}

/// A state-change notification published on the run's bus topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// The run this event concerns.
    pub run_id: String,
    /// The run's parent, if any (events are also published on its topic).
    pub parent_run_id: Option<String>,
    /// Caller-supplied session key, if present in `meta.session_key`.
    #[serde(default)]
    pub session_key: Option<String>,
    /// New status.
    pub status: RunStatus,
    /// Event discriminator, e.g. `"status_changed"`.
    pub event: String,
    /// Wall-clock milliseconds of the transition.
    pub timestamp_ms: TimestampMs,
}
