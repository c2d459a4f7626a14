//! Compaction trigger detection (spec §4.6): token signal and
//! message-count signal, either of which fires compaction.

use astrid_session::SessionEntry;

use crate::config::CompactionConfig;
use crate::estimate::estimate_entry_tokens;

/// Reason compaction should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Estimated total context tokens exceed `context_window - reserve_tokens`.
    TokenBudget,
    /// Message count reached `floor(limit * trigger_ratio)` for a provider
    /// that caps request history by message count.
    MessageCount,
}

/// Evaluate both signals against `path` (the current branch). Returns the
/// first reason that fires, or `None` if neither does.
#[must_use]
pub fn should_trigger(path: &[&SessionEntry], config: &CompactionConfig, provider_message_limit: Option<usize>) -> Option<TriggerReason> {
    if let Some(window) = config.context_window {
        let budget = window.saturating_sub(config.reserve_tokens);
        let total: u64 = path.iter().map(|e| estimate_entry_tokens(e)).sum();
        if total > budget {
            return Some(TriggerReason::TokenBudget);
        }
    }
    if let Some(limit) = provider_message_limit {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let threshold = (limit as f64 * config.message_limit_trigger_ratio).floor() as usize;
        if path.len() >= threshold {
            return Some(TriggerReason::MessageCount);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_session::{ContentBlock, EntryPayload, Message};

    fn msg_entry(id: &str, text: &str) -> SessionEntry {
        SessionEntry {
            id: id.to_string(),
            parent_id: None,
            timestamp: 0,
            payload: EntryPayload::Message {
                message: Message::User {
                    timestamp: 0,
                    content: vec![ContentBlock::text(text)],
                },
            },
        }
    }

    #[test]
    fn token_budget_trigger_fires_past_threshold() {
        let e = msg_entry("1", &"x".repeat(100_000));
        let path = vec![&e];
        let config = CompactionConfig {
            context_window: Some(1000),
            reserve_tokens: 0,
            ..CompactionConfig::default()
        };
        assert_eq!(should_trigger(&path, &config, None), Some(TriggerReason::TokenBudget));
    }

    #[test]
    fn message_count_trigger_fires_at_ratio() {
        let entries: Vec<SessionEntry> = (0..9).map(|i| msg_entry(&i.to_string(), "hi")).collect();
        let path: Vec<&SessionEntry> = entries.iter().collect();
        let config = CompactionConfig::default(); // trigger_ratio 0.9
        assert_eq!(should_trigger(&path, &config, Some(10)), Some(TriggerReason::MessageCount));
    }

    #[test]
    fn no_trigger_under_both_thresholds() {
        let e = msg_entry("1", "hi");
        let path = vec![&e];
        let config = CompactionConfig {
            context_window: Some(1_000_000),
            ..CompactionConfig::default()
        };
        assert_eq!(should_trigger(&path, &config, Some(100)), None);
    }
}
