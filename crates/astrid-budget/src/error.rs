//! Budget error types.

use thiserror::Error;

/// Errors returned by budget tracker operations.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// No budget record exists for the given run id.
    #[error("budget not found for run {0}")]
    NotFound(String),

    /// The run already has a budget (double `create`).
    #[error("budget already exists for run {0}")]
    AlreadyExists(String),
}

/// Result type for budget operations.
pub type BudgetResult<T> = Result<T, BudgetError>;
