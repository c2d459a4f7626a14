//! The LLM driver boundary: the orchestrator's external collaborator.
//!
//! This crate never speaks a provider's wire protocol — that is
//! `astrid_llm::LlmProvider`'s job. A [`SessionDriver`] sits one layer up:
//! it owns a single in-flight turn against some provider, exposes the
//! control surface spec §4.5 names (prompt/steer/follow_up/abort/...), and
//! reports back through [`DriverEvent`]s the orchestrator actor drains
//! from a mailbox. Implemented by whatever wires a real provider in;
//! defined here only as the seam, same shape as
//! `astrid_compaction::Summarizer`.

use async_trait::async_trait;
use astrid_session::{ContentBlock, Message, ThinkingLevel};
use tokio::sync::mpsc;

use crate::error::OrchestratorResult;

/// Events a [`SessionDriver`] reports back to its orchestrator, drained
/// from the mailbox returned by [`SessionDriver::subscribe`].
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// A new assistant turn has begun.
    AgentStart,
    /// An assistant message began streaming.
    MessageStart,
    /// An assistant message finished streaming.
    MessageEnd {
        /// The completed message.
        message: Message,
    },
    /// The assistant's turn ended (it may still continue with tool calls).
    TurnEnd,
    /// A tool call is about to execute.
    ToolExecutionStart {
        /// The tool call's id.
        tool_call_id: String,
        /// The tool's name.
        tool_name: String,
    },
    /// A tool call finished executing.
    ToolExecutionEnd {
        /// The tool call's id.
        tool_call_id: String,
        /// Whether the tool reported an error.
        is_error: bool,
    },
    /// The run reached a terminal, successful stop with no more pending
    /// tool calls or queued follow-ups.
    AgentEnd {
        /// Every message observed since the run started.
        messages: Vec<Message>,
    },
    /// The driver hit an unrecoverable error mid-run.
    Error {
        /// Human-readable reason, checked by the overflow-recovery path
        /// against its phrase list.
        reason: String,
        /// Messages observed before the error, for a partial result.
        partial: Vec<Message>,
    },
}

/// The orchestrator's view of an LLM driver: one in-flight conversation
/// against a provider, controlled by the operations spec §4.5 names.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Begin (or continue) a turn with a new user prompt.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::OrchestratorError::Driver`] if the
    /// underlying provider call cannot be started.
    async fn prompt(&self, text: String, images: Vec<ContentBlock>) -> OrchestratorResult<()>;

    /// Inject text mid-run, delivered after the current tool execution.
    async fn steer(&self, text: String) -> OrchestratorResult<()>;

    /// Queue text to be delivered once the agent reports no more tool
    /// calls and no pending steering.
    async fn follow_up(&self, text: String) -> OrchestratorResult<()>;

    /// Cancel the in-flight turn, if any.
    async fn abort(&self) -> OrchestratorResult<()>;

    /// Replace the tool set available to the next turn.
    async fn set_tools(&self, tools: Vec<String>) -> OrchestratorResult<()>;

    /// Switch the active provider/model.
    async fn set_model(&self, provider: String, model: String) -> OrchestratorResult<()>;

    /// Change the reasoning effort for subsequent turns.
    async fn set_thinking_level(&self, level: ThinkingLevel) -> OrchestratorResult<()>;

    /// Replace the system prompt for subsequent turns.
    async fn set_system_prompt(&self, prompt: String) -> OrchestratorResult<()>;

    /// Resume a turn that stopped only because it was waiting on
    /// something (e.g. an approval decision).
    async fn continue_run(&self) -> OrchestratorResult<()>;

    /// Block until the driver has no in-flight turn, or `timeout` elapses.
    async fn wait_for_idle(&self, timeout: std::time::Duration) -> OrchestratorResult<()>;

    /// Abandon the in-flight turn and clear any queued steer/follow-up
    /// text, without touching the session log.
    async fn reset(&self) -> OrchestratorResult<()>;

    /// Replace the driver's working message list, e.g. after a compaction
    /// or a branch navigation rebuilt the context from the log.
    async fn replace_messages(&self, messages: Vec<Message>) -> OrchestratorResult<()>;
}

/// Pairs a driver with the mailbox it reports events on. The orchestrator
/// actor owns the receiving half; `subscribe` is called once at
/// construction, not per listener — fan-out to `subscribe`/`stream`
/// callers happens in [`crate::event`], downstream of this mailbox.
pub struct DriverHandle {
    /// The driver itself.
    pub driver: std::sync::Arc<dyn SessionDriver>,
    /// Receives [`DriverEvent`]s as the driver's turn progresses.
    pub events: mpsc::Receiver<DriverEvent>,
}
