//! Recursive truncation of tool-call argument values (spec §4.9).

use serde_json::Value;

use crate::text::truncate_arg_string;
use std::path::Path;

/// Recurse into `value`, replacing any string longer than `limit` bytes
/// with a [`crate::text::TruncatedPlaceholder`] (serialized to JSON).
/// Lists and objects are recursed into; numbers/bools/null pass through
/// untouched.
#[must_use]
pub fn truncate_arg_value(value: &Value, limit: usize, spill_root: Option<&Path>, label: &str) -> Value {
    match value {
        Value::String(s) if s.len() > limit => {
            let placeholder = truncate_arg_string(s, limit, spill_root, label);
            serde_json::to_value(placeholder).unwrap_or(Value::Null)
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| truncate_arg_value(v, limit, spill_root, &format!("{label}[{i}]")))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_arg_value(v, limit, spill_root, &format!("{label}.{k}"))))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaves_small_values_untouched() {
        let v = json!({"a": 1, "b": true, "c": "short", "d": null});
        assert_eq!(truncate_arg_value(&v, 1000, None, "x"), v);
    }

    #[test]
    fn truncates_long_string_leaves_at_correct_path() {
        let v = json!({"content": "x".repeat(2000), "count": 3});
        let out = truncate_arg_value(&v, 100, None, "tool:write");
        assert!(out["content"].get("_truncated").is_some());
        assert_eq!(out["count"], 3);
    }

    #[test]
    fn recurses_into_arrays() {
        let v = json!(["short", "y".repeat(2000)]);
        let out = truncate_arg_value(&v, 100, None, "args");
        assert_eq!(out[0], "short");
        assert!(out[1].get("_truncated").is_some());
    }
}
