//! Extension system error types.

use thiserror::Error;

/// Errors from extension discovery, validation, and registry operations.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// An extension module is already registered under this name.
    #[error("extension already registered: {0}")]
    AlreadyRegistered(String),

    /// The named extension is not in the registry.
    #[error("extension not found: {0}")]
    NotFound(String),

    /// A discovered source file did not implement the required shape
    /// (`name`, `version`, and at least one optional hook).
    #[error("not a valid extension module: {0}")]
    InvalidShape(String),

    /// A hook callback returned a value of the wrong type.
    #[error("validation failed for {module}.{hook}: {message}")]
    ValidationFailed {
        /// The extension module.
        module: String,
        /// The hook that failed validation.
        hook: String,
        /// What was wrong.
        message: String,
    },

    /// The tool provided by an extension could not be executed.
    #[error("extension tool execution failed: {0}")]
    ExecutionFailed(String),
}

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;
