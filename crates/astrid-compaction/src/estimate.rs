//! Cheap token estimation used only for trigger detection and cut-point
//! walking — not billing-accurate, just `chars / 4` per spec §4.6.

use astrid_session::{EntryPayload, SessionEntry};

/// Estimate the token cost of one entry, delegating to
/// [`astrid_session::Message::estimated_tokens`] for message-shaped
/// payloads and falling back to `chars / 4` for everything else.
#[must_use]
pub fn estimate_entry_tokens(entry: &SessionEntry) -> u64 {
    match &entry.payload {
        EntryPayload::Message { message } => message.estimated_tokens() as u64,
        EntryPayload::Compaction { summary, .. } | EntryPayload::BranchSummary { summary, .. } => {
            (summary.chars().count() as u64).div_ceil(4)
        },
        EntryPayload::CustomMessage { content, .. } => (content.chars().count() as u64).div_ceil(4),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_session::{EntryPayload, SessionEntry};

    #[test]
    fn estimates_proportional_to_length() {
        let entry = SessionEntry {
            id: "1".to_string(),
            parent_id: None,
            timestamp: 0,
            payload: EntryPayload::Message {
                message: Message::User {
                    timestamp: 0,
                    content: vec![ContentBlock::text("x".repeat(400))],
                },
            },
        };
        assert_eq!(estimate_entry_tokens(&entry), 100);
    }
}
