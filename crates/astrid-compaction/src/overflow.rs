//! Overflow auto-recovery (spec §4.5, §8 property 10): when the driver
//! reports a context-overflow error, force-compact once and retry before
//! giving up and forwarding the original error.

use std::collections::HashSet;
use std::time::Duration;

use astrid_session::SessionLog;
use tracing::{debug, warn};

use crate::apply::compact;
use crate::config::CompactionConfig;
use crate::error::{CompactionError, CompactionResult};
use crate::summary::Summarizer;

/// Case-insensitive substrings that identify a driver error as a
/// context-overflow condition eligible for auto-recovery.
const OVERFLOW_PHRASES: &[&str] = &[
    "context_length_exceeded",
    "context length exceeded",
    "context window",
    "maximum context length",
];

/// Whether `reason` names a context-overflow condition.
#[must_use]
pub fn is_overflow_error(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    OVERFLOW_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Tracks which turns have already had an overflow-recovery attempt, so
/// at most one runs per turn.
#[derive(Debug, Default)]
pub struct OverflowRecoveryTracker {
    attempted_turns: HashSet<String>,
}

impl OverflowRecoveryTracker {
    /// A fresh tracker with no turns marked.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `turn_id` has already had a recovery attempt.
    #[must_use]
    pub fn has_attempted(&self, turn_id: &str) -> bool {
        self.attempted_turns.contains(turn_id)
    }

    /// Clear the attempted mark for `turn_id`, e.g. when a new turn starts.
    pub fn clear(&mut self, turn_id: &str) {
        self.attempted_turns.remove(turn_id);
    }
}

/// Outcome of one overflow-recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Compaction succeeded in time; the caller should retry the turn.
    Recovered {
        /// The id of the newly appended compaction entry.
        compaction_entry_id: String,
    },
    /// Compaction failed, timed out, or this turn already had an attempt;
    /// the caller must forward the original error.
    GiveUp,
}

/// Run exactly one overflow-recovery attempt for `turn_id` if none has run
/// yet this turn. Force-compacts with a bounded timeout; marks the turn as
/// attempted regardless of outcome so a second overflow on the same turn
/// does not retry.
pub async fn attempt_recovery(
    tracker: &mut OverflowRecoveryTracker,
    turn_id: &str,
    log: &mut SessionLog,
    summarizer: &dyn Summarizer,
    config: &CompactionConfig,
) -> RecoveryOutcome {
    if tracker.has_attempted(turn_id) {
        warn!(turn_id, "overflow recovery already attempted this turn, forwarding original error");
        return RecoveryOutcome::GiveUp;
    }
    tracker.attempted_turns.insert(turn_id.to_string());

    debug!(turn_id, "attempting overflow recovery compaction");
    let timeout = Duration::from_secs(config.overflow_recovery_timeout_secs);
    let result: CompactionResult<String> = match tokio::time::timeout(timeout, compact(log, summarizer, config, true)).await {
        Ok(inner) => inner,
        Err(_) => Err(CompactionError::Aborted),
    };

    match result {
        Ok(compaction_entry_id) => {
            debug!(turn_id, entry = compaction_entry_id.as_str(), "overflow recovery succeeded");
            RecoveryOutcome::Recovered { compaction_entry_id }
        },
        Err(err) => {
            warn!(turn_id, error = %err, "overflow recovery failed");
            RecoveryOutcome::GiveUp
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_session::{ContentBlock, EntryPayload, Message, SessionEntry};
    use async_trait::async_trait;

    struct StubSummarizer;

    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, _messages: &[Message]) -> CompactionResult<String> {
            Ok("summary".to_string())
        }
    }

    fn user_entry(text: &str, ts: i64) -> SessionEntry {
        SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp: ts,
            payload: EntryPayload::Message {
                message: Message::User {
                    timestamp: ts,
                    content: vec![ContentBlock::text(text)],
                },
            },
        }
    }

    #[test]
    fn recognizes_overflow_phrases_case_insensitively() {
        assert!(is_overflow_error("Context Length Exceeded"));
        assert!(is_overflow_error("prompt exceeds MAXIMUM CONTEXT LENGTH"));
        assert!(!is_overflow_error("rate limited"));
    }

    #[tokio::test]
    async fn only_one_attempt_per_turn() {
        let mut log = SessionLog::new("/tmp", None, None, 0);
        log.append(user_entry("a", 1)).unwrap();
        log.append(user_entry("b", 2)).unwrap();
        log.append(user_entry("c", 3)).unwrap();

        let config = CompactionConfig {
            keep_recent_tokens: 0,
            ..CompactionConfig::default()
        };
        let mut tracker = OverflowRecoveryTracker::new();
        let first = attempt_recovery(&mut tracker, "turn-1", &mut log, &StubSummarizer, &config).await;
        assert!(matches!(first, RecoveryOutcome::Recovered { .. }));

        let second = attempt_recovery(&mut tracker, "turn-1", &mut log, &StubSummarizer, &config).await;
        assert_eq!(second, RecoveryOutcome::GiveUp);
    }

    #[test]
    fn clearing_turn_allows_a_new_attempt() {
        let mut tracker = OverflowRecoveryTracker::new();
        tracker.attempted_turns.insert("turn-1".to_string());
        assert!(tracker.has_attempted("turn-1"));
        tracker.clear("turn-1");
        assert!(!tracker.has_attempted("turn-1"));
    }
}
