//! Budget ceilings and accumulated usage (spec §3 `Budget`, §4.8).

use serde::{Deserialize, Serialize};

/// Per-axis ceilings. `None` means unlimited on that axis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BudgetLimits {
    /// Maximum total tokens (input + output + cache read + cache write).
    #[serde(default)]
    pub max_tokens: Option<u64>,
    /// Maximum total cost, in the provider's cost unit (USD).
    #[serde(default)]
    pub max_cost: Option<f64>,
    /// Maximum concurrently active children.
    #[serde(default)]
    pub max_children: Option<u32>,
}

impl BudgetLimits {
    /// Combine two limit sets, taking the tighter (smaller) bound per axis.
    /// `None` (unlimited) loses to any concrete bound on the other side —
    /// this implements the spec's "opts may tighten but not loosen"
    /// inheritance rule when called as `parent.tighten(opts)`.
    #[must_use]
    pub fn tighten(self, other: Self) -> Self {
        Self {
            max_tokens: min_opt(self.max_tokens, other.max_tokens),
            max_cost: min_opt_f64(self.max_cost, other.max_cost),
            max_children: min_opt(self.max_children, other.max_children),
        }
    }
}

fn min_opt<T: Ord + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn min_opt_f64(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Accumulated usage against a [`BudgetLimits`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BudgetUsage {
    /// Tokens spent so far.
    pub used_tokens: u64,
    /// Cost spent so far.
    pub used_cost: f64,
    /// Currently active (non-terminal) children.
    pub active_children: u32,
}

/// A snapshot of a budget: its limits and accumulated usage, suitable for
/// embedding as run-record side-data (spec §3 `RunRecord.budget`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BudgetSnapshot {
    /// Ceilings for this budget.
    pub limits: BudgetLimits,
    /// Usage accumulated so far.
    pub usage: BudgetUsage,
    /// When this budget was created.
    pub created_at: i64,
}

impl BudgetSnapshot {
    /// Remaining tokens, if `max_tokens` is set.
    #[must_use]
    pub fn remaining_tokens(&self) -> Option<u64> {
        self.limits.max_tokens.map(|m| m.saturating_sub(self.usage.used_tokens))
    }

    /// Remaining cost, if `max_cost` is set.
    #[must_use]
    pub fn remaining_cost(&self) -> Option<f64> {
        self.limits.max_cost.map(|m| (m - self.usage.used_cost).max(0.0))
    }
}

/// Why an enforcement check failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ExceededAxis {
    /// Token ceiling would be exceeded.
    Tokens {
        /// Tokens that would be used if the operation proceeded.
        would_use: u64,
        /// The ceiling.
        limit: u64,
    },
    /// Cost ceiling would be exceeded.
    Cost {
        /// Cost that would be used if the operation proceeded.
        would_use: f64,
        /// The ceiling.
        limit: f64,
    },
    /// Child-concurrency ceiling would be exceeded.
    Children {
        /// Active children if the spawn proceeded.
        would_have: u32,
        /// The ceiling.
        limit: u32,
    },
    /// An optional outer workspace-cumulative ceiling was exceeded.
    Workspace {
        /// Axis within the workspace ceiling that was exceeded.
        axis: WorkspaceAxis,
    },
}

/// Which axis of the optional outer workspace ceiling was exceeded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkspaceAxis {
    /// Workspace-cumulative token ceiling.
    Tokens,
    /// Workspace-cumulative cost ceiling.
    Cost,
}
