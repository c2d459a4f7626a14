//! The orchestrator's command table (spec §4.5). Every public operation
//! on [`crate::orchestrator::Orchestrator`] is serialized through a
//! single actor task by sending one of these and awaiting its reply.

use astrid_session::{ContentBlock, ThinkingLevel};
use tokio::sync::oneshot;

use crate::error::OrchestratorResult;
use crate::event::{DirectSubscription, StreamSubscription, SubscribeOpts};

/// Options for `compact`.
#[derive(Debug, Clone, Default)]
pub struct CompactOpts {
    /// Bypass cut-point validity checks, falling back to
    /// `min_keep_messages` / forward-scan recovery.
    pub force: bool,
    /// A caller-provided summary, bypassing generation.
    pub summary: Option<String>,
    /// Extra instructions folded into the summarization request.
    pub custom_instructions: Option<String>,
}

/// Options for `navigate_tree`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigateOpts {
    /// When switching away from the current branch, generate and record
    /// an asynchronous summary of the path being abandoned.
    pub summarize_abandoned: bool,
}

/// Options for `summarize_current_branch`.
#[derive(Debug, Clone, Default)]
pub struct SummarizeOpts {
    /// Extra instructions folded into the summarization request.
    pub custom_instructions: Option<String>,
}

/// Outcome of a successful `compact` call.
#[derive(Debug, Clone)]
pub struct CompactOutcome {
    /// The appended compaction entry's id.
    pub entry_id: String,
    /// Estimated tokens in the span summarized away.
    pub tokens_before: usize,
}

/// Outcome of a successful `summarize_current_branch` call.
#[derive(Debug, Clone)]
pub struct BranchSummaryOutcome {
    /// The appended branch-summary entry's id.
    pub entry_id: String,
}

pub(crate) type Reply<T> = oneshot::Sender<OrchestratorResult<T>>;

/// One serialized operation against the orchestrator actor.
pub(crate) enum Command {
    Prompt {
        text: String,
        images: Vec<ContentBlock>,
        reply: Reply<()>,
    },
    Steer {
        text: String,
        reply: Reply<()>,
    },
    FollowUp {
        text: String,
        reply: Reply<()>,
    },
    Abort {
        reply: Reply<()>,
    },
    Reset {
        reply: Reply<()>,
    },
    SubscribeDirect {
        reply: Reply<DirectSubscription>,
    },
    SubscribeStream {
        opts: SubscribeOpts,
        reply: Reply<StreamSubscription>,
    },
    SwitchModel {
        provider: String,
        model: String,
        reply: Reply<()>,
    },
    SetThinkingLevel {
        level: ThinkingLevel,
        reply: Reply<()>,
    },
    Compact {
        opts: CompactOpts,
        reply: Reply<CompactOutcome>,
    },
    NavigateTree {
        entry_id: String,
        opts: NavigateOpts,
        reply: Reply<()>,
    },
    ReloadExtensions {
        reply: Reply<()>,
    },
    SummarizeCurrentBranch {
        opts: SummarizeOpts,
        reply: Reply<BranchSummaryOutcome>,
    },
}
