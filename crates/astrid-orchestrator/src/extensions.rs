//! The extension-loading seam the orchestrator's `reload_extensions`
//! command drives. Compiling a discovered source file into a live module
//! is outside this crate's scope (`astrid_extensions` only defines the
//! module trait and composition rules) — the orchestrator is handed a
//! loader the same way `astrid_compaction` is handed a [`Summarizer`].

use std::path::Path;
use std::sync::Arc;

use astrid_extensions::ExtensionModule;

pub use astrid_extensions::StatusReport;

/// Compiles a discovered extension source file into a live module, or
/// reports why it could not.
pub trait ExtensionLoader: Send + Sync {
    /// Load the module at `path`, returning `Ok(None)` for a file that
    /// does not declare the extension shape (not an error, just not an
    /// extension), or `Err` with a human-readable reason.
    fn load(&self, path: &Path) -> Result<Option<Arc<dyn ExtensionModule>>, String>;
}
