//! Session orchestration and subagent coordination for the Astrid agent
//! runtime.
//!
//! This crate composes the independently-built session log, run graph,
//! budget, lane queue, compaction, and extension crates into the two
//! higher-level pieces a running agent actually drives against:
//!
//! - [`Orchestrator`]: one actor task per conversation, serializing every
//!   mutation (prompting, steering, compaction, tree navigation, model
//!   switches, extension reloads) through a single mailbox, the same
//!   single-writer pattern `astrid_rungraph`'s writer task uses.
//! - [`run_subagents`]: spawns child sessions against a shared deadline
//!   and collects their results in submission order, built directly on
//!   top of `astrid_rungraph::RunGraph` for lineage.
//!
//! Neither the LLM driver nor the extension compiler nor the child-session
//! provisioner is implemented here — each is a trait seam
//! ([`SessionDriver`], [`ExtensionLoader`], [`ChildSessionSpawner`]) the
//! embedding application plugs in, mirroring how `astrid_compaction`
//! only defines `Summarizer` and never talks to a model itself.
//!
//! [`RuntimeSettings`] loads the compaction/budget/guardrails tunables
//! table from one TOML document so embedders don't hand-wire each
//! sub-crate's config struct separately.

mod actor;
mod command;
mod config;
mod driver;
mod error;
mod event;
mod extensions;
mod orchestrator;
mod subagent;
mod system_prompt;

pub use actor::ActorConfig;
pub use command::{BranchSummaryOutcome, CompactOpts, CompactOutcome, NavigateOpts, SummarizeOpts};
pub use config::{ConfigError, RuntimeSettings};
pub use driver::{DriverEvent, DriverHandle, SessionDriver};
pub use error::{OrchestratorError, OrchestratorResult, SubagentStatus};
pub use event::{
    CancelReason, DirectSubscription, DropPolicy, EventHub, OrchestratorEvent, StreamOutcome, StreamSubscription, SubscribeMode,
    SubscribeOpts,
};
pub use extensions::{ExtensionLoader, StatusReport};
pub use orchestrator::{CompactionSettings, Orchestrator};
pub use subagent::{run_subagents, ChildSession, ChildSessionSpawner, SubagentCatalog, SubagentResult, SubagentSpec};
pub use system_prompt::{compose as compose_system_prompt, Scope as SystemPromptScope};
