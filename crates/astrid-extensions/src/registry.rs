//! Tool registry composition: built-ins first, then extension tools
//! sorted by module name, with conflicts recorded rather than dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use astrid_approval::policy::{PolicyResult, SecurityPolicy};
use astrid_approval::SensitiveAction;
use tracing::warn;

use crate::manifest::{ExtensionModule, LoadError};
use crate::tool::ExtensionTool;

/// Who won a tool-name collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictWinner {
    /// A built-in tool won; built-ins always take precedence.
    Builtin,
    /// The named extension module won.
    Extension(String),
}

/// One tool-name collision, recorded rather than silently resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    /// The contested tool name.
    pub tool_name: String,
    /// Who won.
    pub winner: ConflictWinner,
    /// Names of the extension modules whose tool was shadowed, in the
    /// order they were evaluated.
    pub shadowed: Vec<String>,
}

/// Aggregate result of a composition pass.
#[derive(Default)]
pub struct ConflictReport {
    /// Every tool-name collision observed.
    pub entries: Vec<ConflictEntry>,
    /// Discovery-time load errors carried through for a single UI view.
    pub load_errors: Vec<LoadError>,
    /// Total distinct tool names in the composed set.
    pub tool_count: usize,
}

/// One entry in the final composed tool set.
pub struct ComposedTool {
    /// The tool's name.
    pub name: String,
    /// The tool implementation.
    pub tool: Arc<dyn ExtensionTool>,
    /// The extension module that provided it, or `None` for a built-in
    /// (built-ins are represented by their name only; the caller already
    /// holds the `BuiltinTool` instance and need not route through here).
    pub source_extension: Option<String>,
}

/// Compose the final tool set: built-in names occupy the registry first
/// (in `builtin_names` order, unconditionally winning any collision),
/// then extension tools are added in modules-sorted-by-name order,
/// first extension tool for a given name winning among extensions.
/// Every subsequent same-name tool is recorded as a shadowed conflict.
#[must_use]
pub fn compose(builtin_names: &[String], load_errors: Vec<LoadError>, extensions: &[Arc<dyn ExtensionModule>]) -> (Vec<ComposedTool>, ConflictReport) {
    let mut sorted_extensions: Vec<&Arc<dyn ExtensionModule>> = extensions.iter().collect();
    sorted_extensions.sort_by(|a, b| a.name().cmp(b.name()));

    let mut winners: HashMap<String, ConflictEntry> = HashMap::new();
    let mut composed = Vec::new();
    let mut builtin_set: HashSet<&str> = HashSet::new();

    for name in builtin_names {
        builtin_set.insert(name.as_str());
        winners.insert(
            name.clone(),
            ConflictEntry {
                tool_name: name.clone(),
                winner: ConflictWinner::Builtin,
                shadowed: Vec::new(),
            },
        );
    }

    for module in sorted_extensions {
        for tool in module.tools() {
            let name = tool.name().to_string();
            match winners.get_mut(&name) {
                Some(entry) => {
                    warn!(tool = name.as_str(), module = module.name(), "tool shadowed by an earlier winner");
                    entry.shadowed.push(module.name().to_string());
                },
                None => {
                    winners.insert(
                        name.clone(),
                        ConflictEntry {
                            tool_name: name.clone(),
                            winner: ConflictWinner::Extension(module.name().to_string()),
                            shadowed: Vec::new(),
                        },
                    );
                    composed.push(ComposedTool {
                        name,
                        tool,
                        source_extension: Some(module.name().to_string()),
                    });
                },
            }
        }
    }

    // Only report entries that are genuinely contested (had a shadow) to
    // avoid flooding the report with every uncontested builtin name.
    let contested: Vec<ConflictEntry> = winners.into_values().filter(|e| !e.shadowed.is_empty()).collect();

    let tool_count = builtin_set.len() + composed.len();
    let report = ConflictReport {
        entries: contested,
        load_errors,
        tool_count,
    };
    (composed, report)
}

/// Filter a composed tool set down by a disabled set and, if provided, an
/// enabled-only set (when present, only names in it survive).
#[must_use]
pub fn filter_by_enablement(tools: Vec<ComposedTool>, disabled: &HashSet<String>, enabled_only: Option<&HashSet<String>>) -> Vec<ComposedTool> {
    tools
        .into_iter()
        .filter(|t| !disabled.contains(&t.name))
        .filter(|t| enabled_only.is_none_or(|allowed| allowed.contains(&t.name)))
        .collect()
}

/// Prune tools not allowed under `policy`: a tool whose name is in
/// `policy.blocked_tools` does not survive. This mirrors
/// `SecurityPolicy::check` for `McpToolCall`-shaped actions, treating
/// extension tools as server-qualified calls under their own name.
#[must_use]
pub fn filter_by_policy(tools: Vec<ComposedTool>, policy: &SecurityPolicy) -> Vec<ComposedTool> {
    tools
        .into_iter()
        .filter(|t| {
            let action = SensitiveAction::McpToolCall {
                server: t.source_extension.clone().unwrap_or_default(),
                tool: t.name.clone(),
            };
            !matches!(policy.check(&action), PolicyResult::Blocked { .. })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct StubTool {
        name: &'static str,
    }

    #[async_trait]
    impl ExtensionTool for StubTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn input_schema(&self) -> Value {
            Value::Null
        }
        async fn execute(&self, _args: Value, _ctx: &astrid_tools::ToolContext) -> astrid_tools::ToolResult {
            Ok(String::new())
        }
    }

    struct StubModule {
        name: &'static str,
        tool_name: &'static str,
    }

    impl ExtensionModule for StubModule {
        fn name(&self) -> &str {
            self.name
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn tools(&self) -> Vec<Arc<dyn ExtensionTool>> {
            vec![Arc::new(StubTool { name: self.tool_name })]
        }
    }

    #[test]
    fn builtin_always_wins_and_records_shadow() {
        let builtins = vec!["bash".to_string()];
        let extensions: Vec<Arc<dyn ExtensionModule>> = vec![Arc::new(StubModule { name: "zzz-ext", tool_name: "bash" })];
        let (composed, report) = compose(&builtins, Vec::new(), &extensions);
        assert!(composed.is_empty());
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].winner, ConflictWinner::Builtin);
        assert_eq!(report.entries[0].shadowed, vec!["zzz-ext".to_string()]);
    }

    #[test]
    fn first_extension_by_module_name_wins() {
        let extensions: Vec<Arc<dyn ExtensionModule>> = vec![
            Arc::new(StubModule { name: "bravo", tool_name: "scan" }),
            Arc::new(StubModule { name: "alpha", tool_name: "scan" }),
        ];
        let (composed, report) = compose(&[], Vec::new(), &extensions);
        assert_eq!(composed.len(), 1);
        assert_eq!(composed[0].source_extension.as_deref(), Some("alpha"));
        assert_eq!(report.entries[0].shadowed, vec!["bravo".to_string()]);
    }

    #[test]
    fn enabled_only_set_prunes_everything_else() {
        let tools = vec![ComposedTool {
            name: "scan".to_string(),
            tool: Arc::new(StubTool { name: "scan" }),
            source_extension: Some("alpha".to_string()),
        }];
        let mut enabled = HashSet::new();
        enabled.insert("other".to_string());
        let filtered = filter_by_enablement(tools, &HashSet::new(), Some(&enabled));
        assert!(filtered.is_empty());
    }

    #[test]
    fn policy_blocked_tool_is_pruned() {
        let tools = vec![ComposedTool {
            name: "scan".to_string(),
            tool: Arc::new(StubTool { name: "scan" }),
            source_extension: Some("alpha".to_string()),
        }];
        let mut policy = SecurityPolicy::permissive();
        policy.blocked_tools.insert("alpha:scan".to_string());
        let filtered = filter_by_policy(tools, &policy);
        assert!(filtered.is_empty());
    }
}
