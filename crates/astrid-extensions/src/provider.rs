//! Provider registration: extensions may declare providers, currently
//! only the `:model` type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The kind of provider an extension registers. Only `Model` exists
/// today; the enum leaves room for the host to add kinds without
/// breaking the registry's key shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// An LLM model provider.
    Model,
}

/// One provider declaration from an extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    /// The provider kind.
    pub kind: ProviderKind,
    /// The provider's name, unique within its kind.
    pub name: String,
}

/// Report of a provider-registration pass, suitable for UI display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderReport {
    /// Providers that were registered, keyed by `(kind, name)`.
    pub registered: Vec<(ProviderKind, String, String)>,
    /// Providers that lost to an earlier registration, as
    /// `(kind, name, losing_extension)`.
    pub conflicts: Vec<(ProviderKind, String, String)>,
    /// Total providers declared across all extensions (registered + conflicts).
    pub total_declared: usize,
}

/// Register `providers` declared by extensions, in `extensions` order
/// (built-ins, if any, must already occupy `registry` before this call —
/// built-in providers always take precedence and this function never
/// overwrites an existing key). First extension wins per `{kind, name}`.
#[must_use]
pub fn register_providers(registry: &mut HashMap<(ProviderKind, String), String>, extensions: &[(String, Vec<ProviderDescriptor>)]) -> ProviderReport {
    let mut report = ProviderReport::default();
    for (extension_name, descriptors) in extensions {
        for descriptor in descriptors {
            report.total_declared += 1;
            let key = (descriptor.kind, descriptor.name.clone());
            if registry.contains_key(&key) {
                let existing = registry.get(&key).cloned().unwrap_or_default();
                report.conflicts.push((descriptor.kind, descriptor.name.clone(), existing));
            } else {
                registry.insert(key.clone(), extension_name.clone());
                report.registered.push((descriptor.kind, descriptor.name.clone(), extension_name.clone()));
            }
        }
    }
    report
}
