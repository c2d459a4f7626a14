//! Enforcement actions: translating an exceeded axis into a policy
//! response (spec §4.8 "On exceeded, the enforcer yields one of
//! `{cancel, compact, notify, error}`").

use serde::{Deserialize, Serialize};

use crate::limits::ExceededAxis;

/// A policy for how to react when a budget axis is exceeded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EnforcementPolicy {
    /// Cancel the run outright.
    Cancel,
    /// Trigger forced compaction and retry (tokens axis only; behaves like
    /// `Notify` for cost/children axes since compaction cannot reclaim
    /// those).
    Compact,
    /// Surface a warning but allow the operation to proceed.
    Notify,
    /// Return a hard error to the caller.
    Error,
}

/// The action the enforcer decided on, plus a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnforcementAction {
    /// What the enforcer decided to do.
    pub action: EnforcementPolicyAction,
    /// Human-readable explanation, suitable for surfacing to a user.
    pub message: String,
}

/// The effective action after resolving policy against the exceeded axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EnforcementPolicyAction {
    /// Cancel the run.
    Cancel,
    /// Run forced compaction, then retry.
    Compact,
    /// Proceed, but surface a notification.
    Notify,
    /// Reject with an error.
    Error,
}

/// Resolve `policy` against `axis` into a concrete [`EnforcementAction`].
#[must_use]
pub fn enforce(policy: EnforcementPolicy, axis: &ExceededAxis) -> EnforcementAction {
    let message = describe(axis);
    let action = match (policy, axis) {
        (EnforcementPolicy::Compact, ExceededAxis::Tokens { .. }) => EnforcementPolicyAction::Compact,
        (EnforcementPolicy::Compact, _) => EnforcementPolicyAction::Notify,
        (EnforcementPolicy::Cancel, _) => EnforcementPolicyAction::Cancel,
        (EnforcementPolicy::Notify, _) => EnforcementPolicyAction::Notify,
        (EnforcementPolicy::Error, _) => EnforcementPolicyAction::Error,
    };
    EnforcementAction { action, message }
}

fn describe(axis: &ExceededAxis) -> String {
    match axis {
        ExceededAxis::Tokens { would_use, limit } => {
            format!("token budget exceeded: {would_use} would be used, limit is {limit}")
        },
        ExceededAxis::Cost { would_use, limit } => {
            format!("cost budget exceeded: {would_use:.4} would be used, limit is {limit:.4}")
        },
        ExceededAxis::Children { would_have, limit } => {
            format!("child concurrency exceeded: {would_have} would be active, limit is {limit}")
        },
        ExceededAxis::Workspace { axis } => {
            format!("workspace-cumulative {axis:?} budget exceeded")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_policy_only_compacts_token_axis() {
        let axis = ExceededAxis::Tokens { would_use: 10, limit: 5 };
        let out = enforce(EnforcementPolicy::Compact, &axis);
        assert_eq!(out.action, EnforcementPolicyAction::Compact);

        let axis = ExceededAxis::Cost { would_use: 10.0, limit: 5.0 };
        let out = enforce(EnforcementPolicy::Compact, &axis);
        assert_eq!(out.action, EnforcementPolicyAction::Notify);
    }
}
