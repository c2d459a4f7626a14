//! Approval wrapping: an extension tool's `execute` issues an approval
//! request when policy requires it, with the decision persisted in an
//! approval-context keyed by session + agent so a repeat call in the same
//! turn does not re-prompt.

use std::collections::HashMap;
use std::sync::Arc;

use astrid_approval::policy::{PolicyResult, SecurityPolicy};
use astrid_approval::{RiskAssessment, SensitiveAction};
use astrid_tools::{ToolContext, ToolError, ToolResult};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::tool::ExtensionTool;

/// Identifies the approval scope a decision is cached under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApprovalContextKey {
    /// The owning session's id.
    pub session_id: String,
    /// The agent (main or subagent) making the call.
    pub agent_id: String,
}

/// Caller-supplied approval surface: asks the frontend whether a
/// risky action should proceed.
#[async_trait::async_trait]
pub trait ApprovalRequester: Send + Sync {
    /// Ask whether `tool_name` (with the given risk assessment) may run.
    async fn request_approval(&self, key: &ApprovalContextKey, tool_name: &str, risk: &RiskAssessment) -> bool;
}

/// Caches approval decisions per `(context, tool_name)` so a policy that
/// requires approval only prompts once per session+agent+tool.
#[derive(Default)]
pub struct ApprovalContext {
    decisions: RwLock<HashMap<(ApprovalContextKey, String), bool>>,
}

impl ApprovalContext {
    /// A fresh, empty approval context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn cached(&self, key: &ApprovalContextKey, tool_name: &str) -> Option<bool> {
        self.decisions.read().await.get(&(key.clone(), tool_name.to_string())).copied()
    }

    async fn remember(&self, key: &ApprovalContextKey, tool_name: &str, approved: bool) {
        self.decisions.write().await.insert((key.clone(), tool_name.to_string()), approved);
    }
}

/// An extension tool wrapped so that a policy-required approval is
/// requested (and its outcome cached) before the underlying tool runs.
pub struct ApprovalWrappedTool {
    inner: Arc<dyn ExtensionTool>,
    source_extension: String,
    policy: SecurityPolicy,
    requester: Arc<dyn ApprovalRequester>,
    context: Arc<ApprovalContext>,
    key: ApprovalContextKey,
}

impl ApprovalWrappedTool {
    /// Wrap `inner`, evaluating `policy` and routing approval requests
    /// through `requester`, caching decisions in `context` under `key`.
    #[must_use]
    pub fn new(
        inner: Arc<dyn ExtensionTool>,
        source_extension: impl Into<String>,
        policy: SecurityPolicy,
        requester: Arc<dyn ApprovalRequester>,
        context: Arc<ApprovalContext>,
        key: ApprovalContextKey,
    ) -> Self {
        Self {
            inner,
            source_extension: source_extension.into(),
            policy,
            requester,
            context,
            key,
        }
    }
}

#[async_trait::async_trait]
impl ExtensionTool for ApprovalWrappedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn input_schema(&self) -> Value {
        self.inner.input_schema()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let action = SensitiveAction::McpToolCall {
            server: self.source_extension.clone(),
            tool: self.inner.name().to_string(),
        };
        match self.policy.check(&action) {
            PolicyResult::Allowed => self.inner.execute(args, ctx).await,
            PolicyResult::Blocked { reason } => Err(ToolError::ExecutionFailed(format!("blocked by policy: {reason}"))),
            PolicyResult::RequiresApproval(risk) => {
                if let Some(decision) = self.context.cached(&self.key, self.inner.name()).await {
                    debug!(tool = self.inner.name(), "reusing cached approval decision");
                    return if decision {
                        self.inner.execute(args, ctx).await
                    } else {
                        Err(ToolError::ExecutionFailed("denied by prior approval decision".to_string()))
                    };
                }
                let approved = self.requester.request_approval(&self.key, self.inner.name(), &risk).await;
                self.context.remember(&self.key, self.inner.name(), approved).await;
                if approved {
                    self.inner.execute(args, ctx).await
                } else {
                    Err(ToolError::ExecutionFailed("approval denied".to_string()))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysApprove(AtomicUsize);

    #[async_trait::async_trait]
    impl ApprovalRequester for AlwaysApprove {
        async fn request_approval(&self, _key: &ApprovalContextKey, _tool_name: &str, _risk: &RiskAssessment) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    struct EchoTool;

    #[async_trait::async_trait]
    impl ExtensionTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes"
        }
        fn input_schema(&self) -> Value {
            Value::Null
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> ToolResult {
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn approval_decision_is_cached_across_calls() {
        let mut policy = SecurityPolicy::permissive();
        policy.approval_required_tools.insert("ext:echo".to_string());
        let requester = Arc::new(AlwaysApprove(AtomicUsize::new(0)));
        let context = Arc::new(ApprovalContext::new());
        let key = ApprovalContextKey {
            session_id: "s1".to_string(),
            agent_id: "main".to_string(),
        };
        let tool = ApprovalWrappedTool::new(Arc::new(EchoTool), "ext", policy, requester.clone(), context, key);
        let ctx = ToolContext::new(std::env::temp_dir(), None);

        tool.execute(Value::Null, &ctx).await.unwrap();
        tool.execute(Value::Null, &ctx).await.unwrap();
        assert_eq!(requester.0.load(Ordering::SeqCst), 1);
    }
}
