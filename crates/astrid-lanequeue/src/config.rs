//! Per-lane-class concurrency caps.

use std::collections::HashMap;

/// The concurrency cap applied to any lane whose class has no explicit
/// entry.
pub const DEFAULT_CAP: usize = 1;

/// A mapping from lane class name to a positive concurrency cap.
#[derive(Debug, Clone, Default)]
pub struct LaneCaps {
    caps: HashMap<String, usize>,
}

impl LaneCaps {
    /// An empty cap table; every lane defaults to [`DEFAULT_CAP`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cap for `class`. Zero is coerced up to 1: a lane can never
    /// have zero concurrency or nothing would ever drain.
    #[must_use]
    pub fn with_cap(mut self, class: impl Into<String>, cap: usize) -> Self {
        self.caps.insert(class.into(), cap.max(1));
        self
    }

    /// The configured cap for `class`, or [`DEFAULT_CAP`] if unset.
    #[must_use]
    pub fn cap_for(&self, class: &str) -> usize {
        self.caps.get(class).copied().unwrap_or(DEFAULT_CAP)
    }
}
