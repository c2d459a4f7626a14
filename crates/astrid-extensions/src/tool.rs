//! Tool trait for extension-provided tools, parallel to
//! `astrid_tools::BuiltinTool`.

use astrid_tools::ToolContext;

/// A tool contributed by an extension. Mirrors `BuiltinTool`'s shape so
/// the registry can hand both kinds to the LLM driver uniformly; the
/// `plugin:{extension}:{tool}`-style naming is applied by the registry,
/// not by the tool itself.
#[async_trait::async_trait]
pub trait ExtensionTool: Send + Sync {
    /// Unqualified tool name, as declared by the extension.
    fn name(&self) -> &str;

    /// Human-readable description for the LLM.
    fn description(&self) -> &str;

    /// JSON Schema for tool input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool.
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> astrid_tools::ToolResult;
}
