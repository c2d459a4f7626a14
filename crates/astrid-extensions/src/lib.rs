//! Extension discovery and tool-registry composition for the Astrid
//! agent runtime.
//!
//! An extension is a module that declares `name`/`version` and
//! implements at least one of `tools`, `hooks`, `providers`,
//! `capabilities`, `config_schema` (see [`manifest::ExtensionModule`]).
//! Discovery never raises on a bad file — failures are captured as
//! [`manifest::LoadError`] records. The composed tool set is built
//! deterministically: built-ins first, then extensions sorted by module
//! name, with every collision recorded in a [`registry::ConflictReport`].
//!
//! Compiling a discovered source file into a live module, and the
//! concrete tools themselves, are outside this crate — callers supply a
//! loader closure and `BuiltinTool`/`ExtensionTool` implementations.

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod approval;
pub mod discovery;
pub mod error;
pub mod manifest;
pub mod provider;
pub mod registry;
pub mod reload;
pub mod tool;

pub use approval::{ApprovalContext, ApprovalContextKey, ApprovalRequester, ApprovalWrappedTool};
pub use discovery::{discover, find_source_files, DiscoveryReport};
pub use error::{ExtensionError, ExtensionResult};
pub use manifest::{has_any_hook, ExtensionModule, LoadError};
pub use provider::{register_providers, ProviderDescriptor, ProviderKind, ProviderReport};
pub use registry::{compose, filter_by_enablement, filter_by_policy, ComposedTool, ConflictEntry, ConflictReport, ConflictWinner};
pub use reload::{ExtensionHost, StatusPublisher, StatusReport};
pub use tool::ExtensionTool;
