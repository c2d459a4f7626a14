//! The required shape of an extension module, and its discovery/load
//! outcome record.

use std::sync::Arc;

use serde_json::Value;

use crate::provider::ProviderDescriptor;
use crate::tool::ExtensionTool;

/// A compiled, loaded extension module.
///
/// An extension is a module that declares `name`/`version` and implements
/// at least one of the optional hooks (`tools`, `hooks`, `providers`,
/// `capabilities`, `config_schema`). This trait is the shape the host
/// loader checks; how the underlying module was compiled (the source
/// language's module format) is outside this crate's concern.
pub trait ExtensionModule: Send + Sync {
    /// The extension's declared name. Used as its sort key for
    /// tool-registry composition and as half of the provider conflict key.
    fn name(&self) -> &str;

    /// The extension's declared version, opaque to the loader.
    fn version(&self) -> &str;

    /// Tools this extension contributes, if any.
    fn tools(&self) -> Vec<Arc<dyn ExtensionTool>> {
        Vec::new()
    }

    /// Lifecycle hook names this extension implements, if any.
    fn hooks(&self) -> Vec<String> {
        Vec::new()
    }

    /// Providers (currently only `:model`) this extension registers.
    fn providers(&self) -> Vec<ProviderDescriptor> {
        Vec::new()
    }

    /// Free-form capability tags this extension declares.
    fn capabilities(&self) -> Vec<String> {
        Vec::new()
    }

    /// JSON Schema describing this extension's own configuration, if it
    /// accepts configuration.
    fn config_schema(&self) -> Option<Value> {
        None
    }
}

/// True if `module` implements at least one optional hook, the condition
/// that distinguishes an extension module from an arbitrary source file
/// that merely happens to declare `name`/`version`.
#[must_use]
pub fn has_any_hook(module: &dyn ExtensionModule) -> bool {
    !module.tools().is_empty()
        || !module.hooks().is_empty()
        || !module.providers().is_empty()
        || !module.capabilities().is_empty()
        || module.config_schema().is_some()
}

/// A structured record of a discovery-time failure: the source path, an
/// error category, and a human-readable message. Captured rather than
/// raised, so one bad file doesn't abort discovery of the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    /// Path of the source file that failed to load.
    pub path: String,
    /// Short error category, e.g. `"invalid_shape"`, `"compile_error"`.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;
    impl ExtensionModule for Bare {
        fn name(&self) -> &str {
            "bare"
        }
        fn version(&self) -> &str {
            "0.1.0"
        }
    }

    struct WithCapability;
    impl ExtensionModule for WithCapability {
        fn name(&self) -> &str {
            "capable"
        }
        fn version(&self) -> &str {
            "0.1.0"
        }
        fn capabilities(&self) -> Vec<String> {
            vec!["net".to_string()]
        }
    }

    #[test]
    fn bare_module_has_no_hooks() {
        assert!(!has_any_hook(&Bare));
    }

    #[test]
    fn module_with_a_capability_counts_as_hooked() {
        assert!(has_any_hook(&WithCapability));
    }
}
