//! The summarization boundary: compaction calls out to an external
//! collaborator (the LLM driver) to turn a span of history into prose.
//! This crate never speaks a provider's wire protocol itself — the
//! orchestrator supplies a [`Summarizer`] implementation.

use async_trait::async_trait;
use astrid_session::Message;

use crate::error::CompactionResult;

/// A span of messages to be summarized, rendered to plain text the way
/// `astrid_session::Message::render_text` would.
#[must_use]
pub fn render_span(messages: &[Message]) -> String {
    messages.iter().map(Message::render_text).collect::<Vec<_>>().join("\n\n")
}

/// External collaborator that turns a span of conversation history into a
/// condensed summary. Implemented by the orchestrator, which has access to
/// the LLM driver; this crate only defines the seam.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a summary of `messages`, the context being compacted away.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CompactionError::SummarizationFailed`] if
    /// the underlying call fails, and
    /// [`crate::error::CompactionError::Aborted`] if `abort` fires first.
    async fn summarize(&self, messages: &[Message]) -> CompactionResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_session::ContentBlock;

    #[test]
    fn render_span_joins_message_text() {
        let messages = vec![
            Message::User {
                timestamp: 0,
                content: vec![ContentBlock::text("hello")],
            },
            Message::User {
                timestamp: 1,
                content: vec![ContentBlock::text("world")],
            },
        ];
        assert_eq!(render_span(&messages), "hello\n\nworld");
    }
}
