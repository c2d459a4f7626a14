//! System prompt composition (spec §4.5): re-evaluated before every
//! prompt dispatch so edits to any of its sources are picked up live.

/// Which bootstrap scope a session composes its prompt under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A top-level conversation: the full workspace bootstrap applies.
    Main,
    /// A subagent session (has a `parent_session`): workspace bootstrap
    /// files are filtered to an allowlist to avoid leaking memory meant
    /// only for the parent.
    Subagent,
}

impl Scope {
    /// `Subagent` when a parent session is present, `Main` otherwise.
    #[must_use]
    pub fn for_parent(parent_session: Option<&str>) -> Self {
        if parent_session.is_some() {
            Self::Subagent
        } else {
            Self::Main
        }
    }

    /// Workspace bootstrap file names visible under this scope. `Main`
    /// sees everything the caller passes in; `Subagent` is filtered to
    /// `AGENTS.md` / `TOOLS.md`.
    #[must_use]
    pub fn filter_bootstrap_files<'a>(&self, files: &'a [(String, String)]) -> Vec<&'a (String, String)> {
        match self {
            Self::Main => files.iter().collect(),
            Self::Subagent => files
                .iter()
                .filter(|(name, _)| name == "AGENTS.md" || name == "TOOLS.md")
                .collect(),
        }
    }
}

/// Compose the full system prompt from its ordered sources: an optional
/// explicit override, an optional prompt-template body, the workspace
/// base prompt, and instructions drawn from context files. Empty sources
/// are dropped; the rest are joined with a blank line between them.
#[must_use]
pub fn compose(
    explicit_system_prompt: Option<&str>,
    prompt_template_body: Option<&str>,
    base_prompt: &str,
    instructions_from_context_files: &str,
) -> Option<String> {
    let parts = [
        explicit_system_prompt.unwrap_or_default(),
        prompt_template_body.unwrap_or_default(),
        base_prompt,
        instructions_from_context_files,
    ];
    let joined: Vec<&str> = parts.iter().copied().map(str::trim).filter(|s| !s.is_empty()).collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_empty_sources_and_joins_the_rest() {
        let composed = compose(None, Some(""), "base prompt", "  ");
        assert_eq!(composed.as_deref(), Some("base prompt"));
    }

    #[test]
    fn all_empty_yields_none() {
        assert_eq!(compose(None, None, "", ""), None);
    }

    #[test]
    fn subagent_scope_filters_to_allowlist() {
        let files = vec![
            ("AGENTS.md".to_string(), "a".to_string()),
            ("MEMORY.md".to_string(), "m".to_string()),
            ("TOOLS.md".to_string(), "t".to_string()),
        ];
        let filtered = Scope::Subagent.filter_bootstrap_files(&files);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|(name, _)| name != "MEMORY.md"));
    }

    #[test]
    fn scope_for_parent() {
        assert_eq!(Scope::for_parent(None), Scope::Main);
        assert_eq!(Scope::for_parent(Some("abcd1234")), Scope::Subagent);
    }
}
