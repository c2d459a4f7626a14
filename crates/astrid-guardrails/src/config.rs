//! Guardrails configuration (spec §6).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tunables for the guardrails transform. Defaults match spec §6.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardrailsConfig {
    /// Cap on concatenated tool-result text, in bytes.
    pub max_tool_result_bytes: usize,
    /// Number of images to keep inline per tool result.
    pub max_tool_result_images: usize,
    /// Cap on a single thinking block, in bytes. `0` drops thinking
    /// blocks entirely.
    pub max_thinking_bytes: usize,
    /// Cap on a single tool-call argument string, in bytes.
    pub max_tool_call_arg_string_bytes: usize,
    /// Content-addressed spill directory, if configured.
    pub spill_dir: Option<PathBuf>,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            max_tool_result_bytes: 60_000,
            max_tool_result_images: 0,
            max_thinking_bytes: 0,
            max_tool_call_arg_string_bytes: 12_000,
            spill_dir: None,
        }
    }
}
