//! Guardrails and fetch error types.

use thiserror::Error;

/// Errors returned by SSRF-safe fetch (spec §4.9, §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The URL could not be parsed, or had no scheme/host, or a
    /// non-http(s) scheme.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The hostname or one of its resolved addresses is blocked.
    #[error("ssrf blocked: {0}")]
    SsrfBlocked(String),

    /// A redirect chain was too long or contained a cycle.
    #[error("redirect error: {0}")]
    RedirectError(String),

    /// The underlying transport failed.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;
