//! Mirror Rust types for the WIT plugin ABI (`astrid:plugin@0.1.0`).
//!
//! These types are the shared vocabulary between the Astrid host and WASM
//! plugin guests. They mirror the records and enums defined in
//! `wit/astrid-plugin.wit` exactly, ensuring a single source of truth for
//! serialization formats.
//!
//! Used by:
//! - **WS-1** (Plugin traits) — function signatures
//! - **WS-3** (Extism integration) — host ↔ guest serialization
//! - **WS-5** (`OpenClaw` shim) — ABI translation layer

use serde::{Deserialize, Serialize};

/// Log severity level for structured plugin logging.
///
/// Maps to the WIT `log-level` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Verbose tracing information.
    Trace,
    /// Debug-level diagnostic information.
    Debug,
    /// General informational messages.
    Info,
    /// Warning conditions that may need attention.
    Warn,
    /// Error conditions.
    Error,
}

/// A key-value pair used for typed header lists.
///
/// Maps to the WIT `key-value-pair` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    /// Header or metadata key.
    pub key: String,
    /// Header or metadata value.
    pub value: String,
}

/// Context passed to a plugin when a hook fires.
///
/// Maps to the WIT `plugin-context` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginContext {
    /// The event name that triggered this hook (e.g. `"pre-tool-call"`).
    pub event: String,
    /// Session ID for the current interaction.
    pub session_id: String,
    /// Authenticated user ID, if available.
    pub user_id: Option<String>,
    /// Event-specific payload as a JSON string.
    pub data: Option<String>,
}

/// Result returned by a plugin after hook execution.
///
/// Maps to the WIT `plugin-result` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginResult {
    /// Action directive (e.g. `"continue"`, `"abort"`, `"modify"`).
    pub action: String,
    /// Optional payload as a JSON string.
    pub data: Option<String>,
}

/// Input arguments for a tool invocation.
///
/// Maps to the WIT `tool-input` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInput {
    /// Tool name to invoke.
    pub name: String,
    /// Tool arguments as a JSON string.
    pub arguments: String,
}

/// Output from a tool execution.
///
/// Maps to the WIT `tool-output` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Result content as a JSON string.
    pub content: String,
    /// Whether this output represents an error.
    pub is_error: bool,
}

/// Metadata describing a tool that a plugin exposes.
///
/// Maps to the WIT `tool-definition` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub input_schema: String,
}

/// HTTP response returned by the host.
///
/// Maps to the WIT `http-response` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<KeyValuePair>,
    /// Response body.
    pub body: String,
}
