//! Lane identity: a plain name, or a `{class, id}` tuple for per-session
//! ordering (spec §4.3: "Lanes may be atoms or tuples").

use std::fmt;

/// A logical lane identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LaneKey {
    /// A single named lane, e.g. `"background_exec"`.
    Atom(String),
    /// A `{class, id}` tuple lane, e.g. `{"session", "abc123"}` — each
    /// distinct `id` gets its own independent queue, but all instances of
    /// the same `class` share its configured concurrency cap.
    Tuple(String, String),
}

impl LaneKey {
    /// A simple named lane.
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Atom(name.into())
    }

    /// A per-entity lane sharing `class`'s configured cap.
    pub fn tuple(class: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Tuple(class.into(), id.into())
    }

    /// The class name used to look up the configured concurrency cap:
    /// the atom itself, or the tuple's first element.
    #[must_use]
    pub fn class(&self) -> &str {
        match self {
            Self::Atom(name) => name,
            Self::Tuple(class, _) => class,
        }
    }
}

impl fmt::Display for LaneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(name) => write!(f, "{name}"),
            Self::Tuple(class, id) => write!(f, "{{{class}, {id}}}"),
        }
    }
}
