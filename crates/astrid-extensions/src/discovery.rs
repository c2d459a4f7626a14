//! Discovery: scan configured directories for extension source files,
//! compile/load each, and capture failures as structured records instead
//! of raising.
//!
//! Compiling a source file into a live [`ExtensionModule`] is specific to
//! the host language's module format (the exact mechanism is outside this
//! crate's concern, matching the spec's tool-implementation Non-goal);
//! callers supply a `loader` closure that does that part. This module
//! owns the directory walk, the captured-not-raised error discipline, and
//! the required-shape validation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::manifest::{LoadError, ExtensionModule, has_any_hook};

/// Outcome of a full discovery pass: the successfully loaded modules plus
/// any load/validation errors, keyed by source path.
#[derive(Default)]
pub struct DiscoveryReport {
    /// Loaded, validated extension modules, in the order their source
    /// files were encountered.
    pub modules: Vec<Arc<dyn ExtensionModule>>,
    /// Structured failure records for files that did not load or did not
    /// satisfy the required shape.
    pub load_errors: Vec<LoadError>,
}

/// Candidate source files found under `dirs`, filtered to `extension`
/// (e.g. `"js"`, `"wasm"`) and sorted for deterministic load order.
#[must_use]
pub fn find_source_files(dirs: &[PathBuf], extension: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            debug!(dir = %dir.display(), "extension directory not readable, skipping");
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}

/// Run discovery: for each candidate path, invoke `loader`. A loader
/// result of `Ok(None)` means the file compiled but did not implement the
/// required shape (`name`/`version` plus at least one optional hook) and
/// is recorded as an `invalid_shape` load error; `Err` is recorded
/// verbatim; `Ok(Some(module))` that fails the hook check is also
/// downgraded to an `invalid_shape` error rather than accepted silently.
pub fn discover<L>(paths: &[PathBuf], mut loader: L) -> DiscoveryReport
where
    L: FnMut(&Path) -> Result<Option<Arc<dyn ExtensionModule>>, String>,
{
    let mut report = DiscoveryReport::default();
    for path in paths {
        match loader(path) {
            Ok(Some(module)) if has_any_hook(module.as_ref()) => {
                debug!(path = %path.display(), name = module.name(), "loaded extension");
                report.modules.push(module);
            },
            Ok(Some(module)) => {
                warn!(path = %path.display(), name = module.name(), "module has no hooks, not an extension");
                report.load_errors.push(LoadError {
                    path: path.display().to_string(),
                    error: "invalid_shape".to_string(),
                    message: format!("module '{}' implements no optional hook", module.name()),
                });
            },
            Ok(None) => {
                report.load_errors.push(LoadError {
                    path: path.display().to_string(),
                    error: "invalid_shape".to_string(),
                    message: "module does not declare name/version".to_string(),
                });
            },
            Err(message) => {
                warn!(path = %path.display(), error = %message, "extension failed to load");
                report.load_errors.push(LoadError {
                    path: path.display().to_string(),
                    error: "load_error".to_string(),
                    message,
                });
            },
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        name: String,
        has_tools: bool,
    }

    impl ExtensionModule for Stub {
        fn name(&self) -> &str {
            &self.name
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn capabilities(&self) -> Vec<String> {
            if self.has_tools {
                vec!["x".to_string()]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn records_load_error_without_crashing_the_pass() {
        let paths = vec![PathBuf::from("a.js"), PathBuf::from("b.js"), PathBuf::from("c.js")];
        let report = discover(&paths, |path| {
            if path.ends_with("b.js") {
                Err("syntax error".to_string())
            } else {
                Ok(Some(Arc::new(Stub {
                    name: path.display().to_string(),
                    has_tools: true,
                }) as Arc<dyn ExtensionModule>))
            }
        });
        assert_eq!(report.modules.len(), 2);
        assert_eq!(report.load_errors.len(), 1);
        assert_eq!(report.load_errors[0].error, "load_error");
    }

    #[test]
    fn bare_module_without_hooks_becomes_invalid_shape() {
        let paths = vec![PathBuf::from("bare.js")];
        let report = discover(&paths, |path| {
            Ok(Some(Arc::new(Stub {
                name: path.display().to_string(),
                has_tools: false,
            }) as Arc<dyn ExtensionModule>))
        });
        assert!(report.modules.is_empty());
        assert_eq!(report.load_errors[0].error, "invalid_shape");
    }
}
