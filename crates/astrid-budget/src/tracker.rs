//! The budget tracker: hierarchical token/cost/concurrency accounting with
//! parent/child inheritance (spec §4.8).

use std::sync::Mutex;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::{BudgetError, BudgetResult};
use crate::limits::{BudgetLimits, BudgetSnapshot, BudgetUsage, ExceededAxis};
use crate::response::{extract_usage, UsageDelta};

/// Caller-supplied overrides when creating a budget. Each field tightens
/// (but never loosens) the inherited parent ceiling on that axis.
pub type BudgetOpts = BudgetLimits;

/// Tracks budgets for every run, keyed by run id. Cheaply cloneable
/// (internally `Arc`-backed via `DashMap`); every mutating method is a
/// single entry-level lock, so read-modify-write per run id is atomic
/// without a process-wide writer.
#[derive(Debug, Default)]
pub struct BudgetTracker {
    budgets: DashMap<String, Mutex<BudgetSnapshot>>,
}

impl BudgetTracker {
    /// Construct an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root budget for `run_id` from `opts` directly (no parent
    /// to inherit from).
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::AlreadyExists`] if `run_id` already has a
    /// budget.
    pub fn create(&self, run_id: &str, opts: BudgetOpts, now_ms: i64) -> BudgetResult<BudgetSnapshot> {
        if self.budgets.contains_key(run_id) {
            return Err(BudgetError::AlreadyExists(run_id.to_string()));
        }
        let snapshot = BudgetSnapshot {
            limits: opts,
            usage: BudgetUsage::default(),
            created_at: now_ms,
        };
        self.budgets.insert(run_id.to_string(), Mutex::new(snapshot));
        debug!(run_id, ?opts, "created root budget");
        Ok(snapshot)
    }

    /// Create a child budget inheriting from `parent_id`: each axis is
    /// `min(parent_value, opts_value)` under the convention that an absent
    /// (`None`) value means unlimited and loses to any concrete bound
    /// (spec §3 `Budget`, §8 property 8).
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::NotFound`] if `parent_id` has no budget, or
    /// [`BudgetError::AlreadyExists`] if `child_id` already has one.
    pub fn create_subagent(
        &self,
        parent_id: &str,
        child_id: &str,
        opts: BudgetOpts,
        now_ms: i64,
    ) -> BudgetResult<BudgetSnapshot> {
        if self.budgets.contains_key(child_id) {
            return Err(BudgetError::AlreadyExists(child_id.to_string()));
        }
        let parent_limits = {
            let entry = self.budgets.get(parent_id).ok_or_else(|| BudgetError::NotFound(parent_id.to_string()))?;
            entry.lock().expect("budget mutex poisoned").limits
        };
        let limits = parent_limits.tighten(opts);
        let snapshot = BudgetSnapshot {
            limits,
            usage: BudgetUsage::default(),
            created_at: now_ms,
        };
        self.budgets.insert(child_id.to_string(), Mutex::new(snapshot));
        debug!(parent_id, child_id, ?limits, "created child budget");
        Ok(snapshot)
    }

    /// Read the current snapshot for `run_id`.
    #[must_use]
    pub fn snapshot(&self, run_id: &str) -> Option<BudgetSnapshot> {
        self.budgets.get(run_id).map(|entry| *entry.lock().expect("budget mutex poisoned"))
    }

    /// Add `tokens`/`cost` to a run's accumulated usage.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::NotFound`] if `run_id` has no budget.
    pub fn record_usage(&self, run_id: &str, tokens: u64, cost: f64) -> BudgetResult<BudgetSnapshot> {
        let entry = self.budgets.get(run_id).ok_or_else(|| BudgetError::NotFound(run_id.to_string()))?;
        let mut guard = entry.lock().expect("budget mutex poisoned");
        guard.usage.used_tokens += tokens;
        guard.usage.used_cost += cost;
        Ok(*guard)
    }

    /// Record usage extracted from a provider response payload (spec §4.8
    /// `record_response_usage`).
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::NotFound`] if `run_id` has no budget.
    pub fn record_response_usage(&self, run_id: &str, response: &serde_json::Value) -> BudgetResult<BudgetSnapshot> {
        let UsageDelta { tokens, cost } = extract_usage(response);
        self.record_usage(run_id, tokens, cost)
    }

    /// Increment `parent_id`'s `active_children` and initialize `child_id`
    /// with its inherited budget, per spec §4.8 `child_started`.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::NotFound`] if `parent_id` has no budget.
    pub fn child_started(&self, parent_id: &str, child_id: &str, opts: BudgetOpts, now_ms: i64) -> BudgetResult<BudgetSnapshot> {
        {
            let entry = self.budgets.get(parent_id).ok_or_else(|| BudgetError::NotFound(parent_id.to_string()))?;
            entry.lock().expect("budget mutex poisoned").usage.active_children += 1;
        }
        if self.budgets.contains_key(child_id) {
            // Already created (e.g. by an earlier create_subagent call);
            // just reuse it.
            return self.snapshot(child_id).ok_or_else(|| BudgetError::NotFound(child_id.to_string()));
        }
        self.create_subagent(parent_id, child_id, opts, now_ms)
    }

    /// Decrement `parent_id`'s `active_children` (clamped at 0) and fold
    /// `child_id`'s accumulated usage into the parent, per spec §4.8
    /// `child_completed`.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::NotFound`] if either run has no budget.
    pub fn child_completed(&self, parent_id: &str, child_id: &str) -> BudgetResult<BudgetSnapshot> {
        let child_usage = {
            let entry = self.budgets.get(child_id).ok_or_else(|| BudgetError::NotFound(child_id.to_string()))?;
            entry.lock().expect("budget mutex poisoned").usage
        };
        let entry = self.budgets.get(parent_id).ok_or_else(|| BudgetError::NotFound(parent_id.to_string()))?;
        let mut guard = entry.lock().expect("budget mutex poisoned");
        guard.usage.active_children = guard.usage.active_children.saturating_sub(1);
        guard.usage.used_tokens += child_usage.used_tokens;
        guard.usage.used_cost += child_usage.used_cost;
        Ok(*guard)
    }

    /// Pre-API enforcement hook: reject if `used + estimated_tokens` would
    /// exceed `max_tokens`, or `used_cost + estimated_cost` would exceed
    /// `max_cost`.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::NotFound`] if `run_id` has no budget.
    pub fn check_pre_api(&self, run_id: &str, estimated_tokens: u64, estimated_cost: f64) -> BudgetResult<Result<(), ExceededAxis>> {
        let snapshot = self.snapshot(run_id).ok_or_else(|| BudgetError::NotFound(run_id.to_string()))?;
        if let Some(limit) = snapshot.limits.max_tokens {
            let would_use = snapshot.usage.used_tokens + estimated_tokens;
            if would_use > limit {
                warn!(run_id, would_use, limit, "pre-api token budget exceeded");
                return Ok(Err(ExceededAxis::Tokens { would_use, limit }));
            }
        }
        if let Some(limit) = snapshot.limits.max_cost {
            let would_use = snapshot.usage.used_cost + estimated_cost;
            if would_use > limit {
                warn!(run_id, would_use, limit, "pre-api cost budget exceeded");
                return Ok(Err(ExceededAxis::Cost { would_use, limit }));
            }
        }
        Ok(Ok(()))
    }

    /// Subagent-spawn enforcement hook: reject if `active_children` would
    /// reach `max_children`, or the parent's own token/cost budget is
    /// already exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`BudgetError::NotFound`] if `parent_id` has no budget.
    pub fn check_subagent_spawn(&self, parent_id: &str) -> BudgetResult<Result<(), ExceededAxis>> {
        let snapshot = self.snapshot(parent_id).ok_or_else(|| BudgetError::NotFound(parent_id.to_string()))?;
        if let Some(limit) = snapshot.limits.max_children {
            let would_have = snapshot.usage.active_children + 1;
            if would_have > limit {
                return Ok(Err(ExceededAxis::Children { would_have, limit }));
            }
        }
        if let Some(limit) = snapshot.limits.max_tokens {
            if snapshot.usage.used_tokens >= limit {
                return Ok(Err(ExceededAxis::Tokens {
                    would_use: snapshot.usage.used_tokens,
                    limit,
                }));
            }
        }
        if let Some(limit) = snapshot.limits.max_cost {
            if snapshot.usage.used_cost >= limit {
                return Ok(Err(ExceededAxis::Cost {
                    would_use: snapshot.usage.used_cost,
                    limit,
                }));
            }
        }
        Ok(Ok(()))
    }

    /// Drop a run's budget record (e.g. on run-graph cleanup of terminal
    /// runs). A no-op if the run has no budget.
    pub fn forget(&self, run_id: &str) {
        self.budgets.remove(run_id);
    }
}
