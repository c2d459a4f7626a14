//! Compaction tunables (spec §6).

use serde::{Deserialize, Serialize};

/// Configuration for trigger detection and cut-point selection. Defaults
/// match spec §6.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompactionConfig {
    /// Upper bound of tokens the provider will accept in one request.
    /// `None` disables the token trigger.
    pub context_window: Option<u64>,
    /// Slack kept free for the model's response.
    pub reserve_tokens: u64,
    /// Tokens retained uncompacted when walking the branch backward.
    pub keep_recent_tokens: u64,
    /// Fraction of a provider's request-message cap that triggers
    /// preemptive compaction.
    pub message_limit_trigger_ratio: f64,
    /// Fraction of messages kept after preemptive (message-count)
    /// compaction.
    pub message_limit_keep_ratio: f64,
    /// Minimum messages kept when `force=true` compaction falls back.
    pub min_keep_messages: usize,
    /// Bound on how long an overflow-recovery compaction attempt may run
    /// before it is abandoned and the original error forwarded.
    pub overflow_recovery_timeout_secs: u64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            context_window: None,
            reserve_tokens: 16_384,
            keep_recent_tokens: 20_000,
            message_limit_trigger_ratio: 0.9,
            message_limit_keep_ratio: 0.6,
            min_keep_messages: 5,
            overflow_recovery_timeout_secs: 120,
        }
    }
}

/// Accept both canonical snake_case and legacy camelCase/string keys when
/// loading compaction settings from a loosely-typed map (spec Open
/// Question 3).
#[must_use]
pub fn from_loose_map(map: &serde_json::Map<String, serde_json::Value>) -> CompactionConfig {
    let mut config = CompactionConfig::default();
    if let Some(v) = lookup(map, &["context_window", "contextWindow"]).and_then(|v| v.as_u64()) {
        config.context_window = Some(v);
    }
    if let Some(v) = lookup(map, &["reserve_tokens", "reserveTokens"]).and_then(|v| v.as_u64()) {
        config.reserve_tokens = v;
    }
    if let Some(v) = lookup(map, &["keep_recent_tokens", "keepRecentTokens"]).and_then(|v| v.as_u64()) {
        config.keep_recent_tokens = v;
    }
    if let Some(v) = lookup(map, &["message_limit_trigger_ratio", "messageLimitTriggerRatio"]).and_then(|v| v.as_f64()) {
        config.message_limit_trigger_ratio = v;
    }
    if let Some(v) = lookup(map, &["message_limit_keep_ratio", "messageLimitKeepRatio"]).and_then(|v| v.as_f64()) {
        config.message_limit_keep_ratio = v;
    }
    if let Some(v) = lookup(map, &["min_keep_messages", "minKeepMessages"]).and_then(|v| v.as_u64()) {
        config.min_keep_messages = v as usize;
    }
    if let Some(v) = lookup(map, &["overflow_recovery_timeout_secs", "overflowRecoveryTimeoutSecs"]).and_then(|v| v.as_u64()) {
        config.overflow_recovery_timeout_secs = v;
    }
    config
}

fn lookup<'a>(map: &'a serde_json::Map<String, serde_json::Value>, keys: &[&str]) -> Option<&'a serde_json::Value> {
    keys.iter().find_map(|k| map.get(*k))
}
