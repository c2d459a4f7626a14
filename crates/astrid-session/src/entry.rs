//! Session entries: the node type of the branching log's tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{Message, TimestampMs};

/// Reasoning effort level for a model, carried by `thinking_level_change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingLevel {
    /// No extended reasoning.
    Off,
    /// Minimal reasoning budget.
    Minimal,
    /// Low reasoning budget.
    Low,
    /// Medium (default) reasoning budget.
    Medium,
    /// High reasoning budget.
    High,
    /// Maximum reasoning budget.
    Xhigh,
}

impl Default for ThinkingLevel {
    fn default() -> Self {
        Self::Medium
    }
}

/// Details attached to a compaction or branch-summary entry: which file
/// paths were touched by the summarized history, recovered by scanning
/// pre-cut tool calls for read/write/edit operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryDetails {
    /// Distinct file paths read during the summarized span.
    #[serde(default)]
    pub files_read: Vec<String>,
    /// Distinct file paths written or edited during the summarized span.
    #[serde(default)]
    pub files_modified: Vec<String>,
}

/// The typed payload of a [`SessionEntry`], selected by the entry's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntryPayload {
    /// A conversation message.
    Message {
        /// The message itself.
        message: Message,
    },
    /// A change of reasoning level.
    ThinkingLevelChange {
        /// The new level.
        level: ThinkingLevel,
    },
    /// A change of active model.
    ModelChange {
        /// Provider name.
        provider: String,
        /// Model id.
        model: String,
    },
    /// A compaction was applied on this branch.
    Compaction {
        /// The generated summary text.
        summary: String,
        /// The id of the first entry kept after compaction.
        first_kept_entry_id: String,
        /// Estimated token count of the branch before compaction.
        tokens_before: usize,
        /// File read/write details recovered from the summarized span.
        #[serde(default)]
        details: SummaryDetails,
        /// Whether this compaction was triggered by an extension hook
        /// rather than the built-in pipeline.
        #[serde(default)]
        from_hook: bool,
    },
    /// A summary of an abandoned branch was recorded.
    BranchSummary {
        /// The leaf id of the branch being summarized.
        from_id: String,
        /// The generated summary text.
        summary: String,
        /// File read/write details recovered from the summarized span.
        #[serde(default)]
        details: SummaryDetails,
        /// Whether this summary was triggered by an extension hook.
        #[serde(default)]
        from_hook: bool,
    },
    /// A user-visible label was attached to (or removed from) an entry.
    Label {
        /// The entry being labeled.
        target_id: String,
        /// The label text, or `None` to unset.
        label: Option<String>,
    },
    /// Session-level metadata, e.g. a display name.
    SessionInfo {
        /// The session's display name.
        name: String,
    },
    /// An extension-defined entry with no built-in semantics beyond the
    /// type tag and an opaque payload. Unknown types read from disk are
    /// coerced into this variant so they round-trip losslessly.
    Custom {
        /// Extension-defined discriminator.
        custom_type: String,
        /// Opaque payload.
        data: Value,
    },
    /// A message-shaped entry contributed by an extension/hook, distinct
    /// from [`EntryPayload::Custom`] in that it participates in
    /// `build_context` like an ordinary message.
    CustomMessage {
        /// Extension-defined discriminator.
        custom_type: String,
        /// Display text.
        content: String,
        /// Whether this should be shown to the user.
        #[serde(default = "default_true")]
        display: bool,
        /// Extra structured detail.
        #[serde(default)]
        details: Value,
    },
}

fn default_true() -> bool {
    true
}

/// One node in the branching session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// 8 lowercase hex chars, unique within the session.
    pub id: String,
    /// The parent entry's id, or `None` at the root.
    #[serde(
        rename = "parentId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<String>,
    /// Milliseconds since epoch.
    pub timestamp: TimestampMs,
    /// The typed payload.
    #[serde(flatten)]
    pub payload: EntryPayload,
}

impl SessionEntry {
    /// True if this entry's payload participates in `build_context` as an
    /// ordinary message (message, custom_message, or branch_summary).
    #[must_use]
    pub fn is_context_bearing(&self) -> bool {
        matches!(
            self.payload,
            EntryPayload::Message { .. }
                | EntryPayload::CustomMessage { .. }
                | EntryPayload::BranchSummary { .. }
        )
    }
}
