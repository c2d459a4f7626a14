use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::TimestampMs;

/// Current on-disk session log schema version. Bump and add a migration
/// arm in [`crate::log::migrate`] when the entry shape changes.
pub const CURRENT_VERSION: u32 = 3;

/// The first line of a session JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHeader {
    /// Always `"session"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Schema version, see [`CURRENT_VERSION`].
    pub version: u32,
    /// Session identifier.
    pub id: Uuid,
    /// Creation time, milliseconds since epoch.
    pub timestamp: TimestampMs,
    /// Working directory the session was started in.
    pub cwd: String,
    /// The parent session id, if this session is a subagent.
    #[serde(
        rename = "parentSession",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_session: Option<Uuid>,
}

impl SessionHeader {
    /// Construct a fresh header at the current schema version.
    #[must_use]
    pub fn new(cwd: impl Into<String>, id: Uuid, now_ms: TimestampMs, parent_session: Option<Uuid>) -> Self {
        Self {
            kind: "session".to_string(),
            version: CURRENT_VERSION,
            id,
            timestamp: now_ms,
            cwd: cwd.into(),
            parent_session,
        }
    }
}
