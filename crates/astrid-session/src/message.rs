//! The message model: content blocks, messages, and usage accounting.
//!
//! This is the wire-independent shape the branching log persists and the
//! compaction pipeline reasons over. It is deliberately richer than
//! `astrid_llm::types::Message`, which is the thin shape a provider's wire
//! protocol actually speaks; the orchestrator translates between the two at
//! the driver boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// A single block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// An inline image.
    Image {
        /// Base64-encoded image bytes.
        data: String,
        /// Image MIME type, e.g. `image/png`.
        mime: String,
    },
    /// A model "thinking" / reasoning block.
    Thinking {
        /// The reasoning text.
        text: String,
    },
    /// A tool invocation requested by the assistant.
    ToolCall {
        /// Unique id for this call, later matched by a `tool_result`.
        id: String,
        /// Tool name, e.g. `builtin:bash` or `server:tool`.
        name: String,
        /// Tool arguments as a JSON object.
        arguments: BTreeMap<String, Value>,
    },
}

impl ContentBlock {
    /// Construct a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The tool-call id carried by this block, if it is a `ToolCall`.
    #[must_use]
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolCall { id, .. } => Some(id),
            _ => None,
        }
    }

    /// The text carried by this block, if it has text (`Text` or `Thinking`).
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::Thinking { text } => Some(text),
            _ => None,
        }
    }
}

/// Why the assistant's turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model reached a natural stopping point.
    Stop,
    /// The model hit its output token limit.
    Length,
    /// The model wants to invoke one or more tools.
    ToolUse,
    /// The provider returned an error mid-stream.
    Error,
    /// The turn was cancelled.
    Aborted,
}

/// Token and cost accounting for one assistant turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens billed.
    #[serde(default)]
    pub input: u64,
    /// Output tokens billed.
    #[serde(default)]
    pub output: u64,
    /// Tokens served from cache.
    #[serde(default)]
    pub cache_read: u64,
    /// Tokens written to cache.
    #[serde(default)]
    pub cache_write: u64,
    /// Total tokens, if the provider reports it directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    /// Cost in USD, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl Usage {
    /// Total tokens: the explicit field when provided, else the sum of the
    /// four counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total_tokens
            .unwrap_or(self.input + self.output + self.cache_read + self.cache_write)
    }
}

/// Whether a tool result came from a source the orchestrator trusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trust {
    /// Content originated from a built-in or extension tool we control.
    Trusted,
    /// Content originated from an untrusted source (e.g. fetched web page).
    Untrusted,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// A message from the human operator.
    User {
        /// Monotonic milliseconds since epoch.
        timestamp: TimestampMs,
        /// Content blocks (usually just text, optionally images).
        content: Vec<ContentBlock>,
    },
    /// A message produced by the assistant.
    Assistant {
        /// Monotonic milliseconds since epoch.
        timestamp: TimestampMs,
        /// Content blocks: text, thinking, and/or tool calls.
        content: Vec<ContentBlock>,
        /// Provider name, e.g. `anthropic`.
        provider: String,
        /// Model id used for this turn.
        model: String,
        /// API variant used, e.g. `messages` or `responses`.
        api: String,
        /// Usage for this turn.
        usage: Usage,
        /// Why the turn ended.
        stop_reason: StopReason,
    },
    /// The result of executing a tool call.
    ToolResult {
        /// Monotonic milliseconds since epoch.
        timestamp: TimestampMs,
        /// The id of the `ToolCall` block this answers.
        #[serde(alias = "tool_use_id")]
        tool_call_id: String,
        /// Name of the tool that was invoked, if known.
        #[serde(default)]
        tool_name: Option<String>,
        /// Result content blocks.
        content: Vec<ContentBlock>,
        /// Whether the tool call failed.
        #[serde(default)]
        is_error: bool,
        /// Trust classification of this result's content.
        trust: Trust,
    },
    /// The raw output of a bash/shell execution, kept distinct from a
    /// tool-call result so compaction can treat it as a safe cut point.
    BashExecution {
        /// Monotonic milliseconds since epoch.
        timestamp: TimestampMs,
        /// The command that was run.
        command: String,
        /// Combined stdout/stderr.
        output: String,
        /// Process exit code, if the process ran to completion.
        #[serde(default)]
        exit_code: Option<i32>,
    },
    /// An extension- or hook-defined message type outside the built-in set.
    Custom {
        /// Monotonic milliseconds since epoch.
        timestamp: TimestampMs,
        /// Discriminator for the custom message's meaning.
        custom_type: String,
        /// Opaque payload.
        data: Value,
    },
    /// A synthetic summary of an abandoned branch, inserted on navigation.
    BranchSummary {
        /// Monotonic milliseconds since epoch.
        timestamp: TimestampMs,
        /// The generated summary text.
        summary: String,
    },
    /// A synthetic summary produced by context compaction, replacing the
    /// messages that came before it on the branch.
    CompactionSummary {
        /// Monotonic milliseconds since epoch.
        timestamp: TimestampMs,
        /// The generated summary text.
        summary: String,
    },
}

impl Message {
    /// The timestamp common to every message variant.
    #[must_use]
    pub fn timestamp(&self) -> TimestampMs {
        match self {
            Self::User { timestamp, .. }
            | Self::Assistant { timestamp, .. }
            | Self::ToolResult { timestamp, .. }
            | Self::BashExecution { timestamp, .. }
            | Self::Custom { timestamp, .. }
            | Self::BranchSummary { timestamp, .. }
            | Self::CompactionSummary { timestamp, .. } => *timestamp,
        }
    }

    /// Content blocks, for the variants that carry them.
    #[must_use]
    pub fn content_blocks(&self) -> &[ContentBlock] {
        match self {
            Self::User { content, .. } | Self::Assistant { content, .. } => content,
            Self::ToolResult { content, .. } => content,
            _ => &[],
        }
    }

    /// All `tool_call` ids this message emits (assistant messages only).
    #[must_use]
    pub fn emitted_tool_call_ids(&self) -> Vec<&str> {
        self.content_blocks()
            .iter()
            .filter_map(ContentBlock::tool_call_id)
            .collect()
    }

    /// The tool-call id this message answers, if it is a `ToolResult`.
    #[must_use]
    pub fn answered_tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolResult { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Render a plain-text approximation of this message, used for token
    /// estimation and summarization prompts.
    #[must_use]
    pub fn render_text(&self) -> String {
        match self {
            Self::User { content, .. } | Self::Assistant { content, .. } => content
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::ToolResult { content, .. } => content
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::BashExecution { command, output, .. } => format!("$ {command}\n{output}"),
            Self::Custom { data, .. } => data.to_string(),
            Self::BranchSummary { summary, .. } | Self::CompactionSummary { summary, .. } => {
                summary.clone()
            },
        }
    }

    /// Rough token estimate (chars / 4), used by the compaction cut-point
    /// walk. This is deliberately not model-accurate; see spec §4.6.
    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        self.render_text().len() / 4
    }
}
