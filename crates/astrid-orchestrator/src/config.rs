//! Runtime settings table (spec §6 "Configuration").
//!
//! Unlike `astrid_config`'s layered system/user/workspace precedence chain
//! for the embedding application's own settings, this loader covers only
//! the table spec §6 actually lists: compaction, budget, and guardrails
//! tunables plus an opaque policy-profile name, read from a single TOML
//! document. It exists so those three independently-built config structs
//! (`astrid_compaction::CompactionConfig`, `astrid_budget::BudgetLimits`,
//! `astrid_guardrails::GuardrailsConfig`) have one place that assembles
//! them from a file instead of each embedder hand-rolling the wiring.

use astrid_budget::BudgetLimits;
use astrid_compaction::CompactionConfig;
use astrid_guardrails::GuardrailsConfig;
use thiserror::Error;

/// Errors loading or parsing the runtime settings table.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A `budget` or `guardrails` sub-table didn't match its target
    /// struct's shape (e.g. a string where a number was expected).
    #[error("invalid {section} table: {source}")]
    InvalidTable {
        /// Which top-level section failed (`"budget"` or `"guardrails"`).
        section: &'static str,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// The assembled settings table for one runtime: compaction tunables,
/// budget ceilings, guardrails caps, and the policy profile name. Policy
/// enforcement itself is out of scope here (a separate, embedding-supplied
/// concern); this only carries the profile name through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeSettings {
    /// Compaction trigger thresholds and cut-point tuning.
    pub compaction: CompactionConfig,
    /// Root-level budget ceilings (tokens/cost/children).
    pub budget: BudgetLimits,
    /// Guardrails caps and spill directory.
    pub guardrails: GuardrailsConfig,
    /// Name of the policy profile to apply, if any (`allow`/`deny`/
    /// `require_approval`/`no_reply` rules live with the embedding
    /// application's policy engine, not here).
    pub policy_profile: Option<String>,
}

impl RuntimeSettings {
    /// Parse a settings table from a TOML document's text.
    ///
    /// Top-level keys are `compaction`, `budget`, `guardrails`, and
    /// `policy_profile`; each sub-table is read loosely, accepting both
    /// canonical snake_case keys and legacy camelCase/string variants per
    /// the spec's config-key Open Question. Absent keys fall back to each
    /// struct's own defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `text` is not valid TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let root: toml::Value = toml::from_str(text)?;
        let root = json_of(root);
        let root = root.as_object().cloned().unwrap_or_default();

        let compaction = root
            .get("compaction")
            .and_then(serde_json::Value::as_object)
            .map(astrid_compaction::config::from_loose_map)
            .unwrap_or_default();

        let budget = root
            .get("budget")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|source| ConfigError::InvalidTable { section: "budget", source })?
            .unwrap_or_default();

        let guardrails = root
            .get("guardrails")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|source| ConfigError::InvalidTable { section: "guardrails", source })?
            .unwrap_or_default();

        let policy_profile = lookup(&root, &["policy_profile", "policyProfile"]).and_then(|v| v.as_str()).map(str::to_owned);

        Ok(Self { compaction, budget, guardrails, policy_profile })
    }

    /// Read and parse a settings table from a file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if its contents are not valid TOML.
    pub fn load_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Self::from_toml_str(&text)
    }
}

fn lookup<'a>(map: &'a serde_json::Map<String, serde_json::Value>, keys: &[&str]) -> Option<&'a serde_json::Value> {
    keys.iter().find_map(|k| map.get(*k))
}

/// `toml::Value` and `serde_json::Value` are structurally identical for
/// our purposes; round-trip through `serde_json` so the rest of this
/// module (and `astrid_compaction::config::from_loose_map`, which already
/// speaks `serde_json`) only ever deals with one value type.
fn json_of(value: toml::Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_table_is_empty() {
        let settings = RuntimeSettings::from_toml_str("").unwrap();
        assert_eq!(settings, RuntimeSettings::default());
    }

    #[test]
    fn reads_snake_case_and_camel_case_compaction_keys() {
        let toml = r#"
            [compaction]
            reserve_tokens = 100
            keepRecentTokens = 500
        "#;
        let settings = RuntimeSettings::from_toml_str(toml).unwrap();
        assert_eq!(settings.compaction.reserve_tokens, 100);
        assert_eq!(settings.compaction.keep_recent_tokens, 500);
    }

    #[test]
    fn reads_budget_and_guardrails_tables() {
        let toml = r#"
            [budget]
            max_tokens = 10000
            max_children = 4

            [guardrails]
            max_tool_result_bytes = 1000
            max_tool_result_images = 2

            policy_profile = "restricted"
        "#;
        let settings = RuntimeSettings::from_toml_str(toml).unwrap();
        assert_eq!(settings.budget.max_tokens, Some(10_000));
        assert_eq!(settings.budget.max_children, Some(4));
        assert_eq!(settings.guardrails.max_tool_result_bytes, 1_000);
        assert_eq!(settings.guardrails.max_tool_result_images, 2);
        assert_eq!(settings.policy_profile.as_deref(), Some("restricted"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(RuntimeSettings::from_toml_str("not = [valid").is_err());
    }
}
