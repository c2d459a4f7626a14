//! Extension reload: purge cached modules, rediscover, rebuild the tool
//! set, swap it into the driver, and publish a status-report event.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::discovery::{discover, DiscoveryReport};
use crate::manifest::ExtensionModule;
use crate::registry::{compose, ConflictReport};

/// Snapshot published after a reload completes, for UI display.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Number of extension modules currently loaded.
    pub modules_loaded: usize,
    /// Number of discovery/validation load errors on this pass.
    pub load_error_count: usize,
    /// Number of tool-name conflicts on this pass.
    pub conflict_count: usize,
    /// Total tools available after composition (built-ins + extensions).
    pub tool_count: usize,
}

impl StatusReport {
    fn from_reports(discovery: &DiscoveryReport, conflicts: &ConflictReport) -> Self {
        Self {
            modules_loaded: discovery.modules.len(),
            load_error_count: discovery.load_errors.len(),
            conflict_count: conflicts.entries.len(),
            tool_count: conflicts.tool_count,
        }
    }
}

/// Receives the status report published at the end of a reload.
pub trait StatusPublisher {
    /// Called once per completed reload, successful or not.
    fn publish(&self, report: &StatusReport);
}

/// Live extension state: the currently loaded modules and the composed
/// tool set derived from them. Owns the reload lifecycle.
pub struct ExtensionHost {
    modules: Vec<Arc<dyn ExtensionModule>>,
}

impl ExtensionHost {
    /// An empty host with no modules loaded.
    #[must_use]
    pub fn new() -> Self {
        Self { modules: Vec::new() }
    }

    /// Currently loaded modules.
    #[must_use]
    pub fn modules(&self) -> &[Arc<dyn ExtensionModule>] {
        &self.modules
    }

    /// Reload: purge the cached module set, rediscover from `paths` via
    /// `loader`, recompose the tool set against `builtin_names`, swap the
    /// new module set into place, and publish a status report.
    pub fn reload<L>(&mut self, paths: &[PathBuf], loader: L, builtin_names: &[String], publisher: &dyn StatusPublisher) -> (DiscoveryReport, ConflictReport)
    where
        L: FnMut(&std::path::Path) -> Result<Option<Arc<dyn ExtensionModule>>, String>,
    {
        info!(modules = self.modules.len(), "purging cached extension modules before reload");
        self.modules.clear();

        let discovery = discover(paths, loader);
        self.modules = discovery.modules.clone();

        let (_composed, conflicts) = compose(builtin_names, discovery.load_errors.clone(), &self.modules);

        let report = StatusReport::from_reports(&discovery, &conflicts);
        info!(modules = report.modules_loaded, errors = report.load_error_count, conflicts = report.conflict_count, "extension reload complete");
        publisher.publish(&report);

        (discovery, conflicts)
    }
}

impl Default for ExtensionHost {
    fn default() -> Self {
        Self::new()
    }
}
