//! Extracting token/cost deltas from an LLM response payload (spec §4.8
//! `record_response_usage`).

use serde_json::Value;

/// A usage delta extracted from a provider response.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageDelta {
    /// Tokens to add to the run's `used_tokens`.
    pub tokens: u64,
    /// Cost to add to the run's `used_cost`.
    pub cost: f64,
}

/// Extract a [`UsageDelta`] from an opaque response payload.
///
/// Tokens come from `total_tokens` if present, else `input + output`
/// (cache read/write are not part of the request-message cap signal and
/// are ignored here if absent, matching the spec's two accepted shapes).
/// Cost comes from `cost` if present. Both default to zero when absent.
#[must_use]
pub fn extract_usage(response: &Value) -> UsageDelta {
    let tokens = response
        .get("total_tokens")
        .and_then(Value::as_u64)
        .unwrap_or_else(|| {
            let input = response.get("input").and_then(Value::as_u64).unwrap_or(0);
            let output = response.get("output").and_then(Value::as_u64).unwrap_or(0);
            let cache_read = response.get("cache_read").and_then(Value::as_u64).unwrap_or(0);
            let cache_write = response.get("cache_write").and_then(Value::as_u64).unwrap_or(0);
            input + output + cache_read + cache_write
        });
    let cost = response.get("cost").and_then(Value::as_f64).unwrap_or(0.0);
    UsageDelta { tokens, cost }
}
