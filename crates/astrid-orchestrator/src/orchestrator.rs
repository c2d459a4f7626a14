//! The orchestrator's public handle: a cheaply-cloneable front door onto
//! the actor task, one per conversation (spec §4.5).

use std::sync::Arc;

use astrid_compaction::{CompactionConfig, Summarizer};
use astrid_session::{ContentBlock, SessionLog, ThinkingLevel};
use tokio::sync::{mpsc, oneshot};

use crate::actor::{ActorConfig, OrchestratorActor};
use crate::command::{BranchSummaryOutcome, Command, CompactOpts, CompactOutcome, NavigateOpts, SummarizeOpts};
use crate::driver::{DriverHandle, SessionDriver};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::event::{DirectSubscription, EventHub, StreamSubscription, SubscribeOpts};
use crate::extensions::ExtensionLoader;

const COMMAND_CHANNEL_CAPACITY: usize = 256;
const EVENT_HUB_CAPACITY: usize = 1024;

/// A handle onto one running session orchestrator. Cloning shares the
/// same underlying actor task; every method sends a command and awaits
/// its reply, so calls from multiple clones are serialized exactly as if
/// a single caller made them one at a time.
#[derive(Clone)]
pub struct Orchestrator {
    cmd_tx: mpsc::Sender<Command>,
}

impl Orchestrator {
    /// Spawn a new orchestrator actor wrapping `driver`, backed by `log`,
    /// and return a handle to it.
    #[must_use]
    pub fn spawn(
        log: SessionLog,
        driver_handle: DriverHandle,
        summarizer: Arc<dyn Summarizer>,
        loader: Arc<dyn ExtensionLoader>,
        config: ActorConfig,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let hub = Arc::new(EventHub::new(log.header().id.to_string(), EVENT_HUB_CAPACITY));
        let actor = OrchestratorActor::new(log, driver_handle.driver, driver_handle.events, hub, summarizer, loader, config);
        tokio::spawn(actor.run(cmd_rx));
        Self { cmd_tx }
    }

    async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<OrchestratorResult<T>>) -> Command) -> OrchestratorResult<T> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx.send(build(reply)).await.map_err(|_| OrchestratorError::ActorGone)?;
        rx.await.map_err(|_| OrchestratorError::ActorGone)?
    }

    /// Begin a new turn with `text` (and optional inline images). Accepts
    /// if no turn is currently streaming; the driver is actually invoked
    /// after a short deferred window to let an immediate steer or abort
    /// race in.
    pub async fn prompt(&self, text: impl Into<String>, images: Vec<ContentBlock>) -> OrchestratorResult<()> {
        let text = text.into();
        self.call(|reply| Command::Prompt { text, images, reply }).await
    }

    /// Inject text mid-run; delivered after the current tool execution.
    pub async fn steer(&self, text: impl Into<String>) -> OrchestratorResult<()> {
        let text = text.into();
        self.call(|reply| Command::Steer { text, reply }).await
    }

    /// Queue text for delivery once the agent has no more pending tool
    /// calls or steering.
    pub async fn follow_up(&self, text: impl Into<String>) -> OrchestratorResult<()> {
        let text = text.into();
        self.call(|reply| Command::FollowUp { text, reply }).await
    }

    /// Cancel the in-flight (or deferred) turn, if any.
    pub async fn abort(&self) -> OrchestratorResult<()> {
        self.call(|reply| Command::Abort { reply }).await
    }

    /// Cancel any in-flight turn and return the driver to a fresh,
    /// idle state rebuilt from the session log.
    pub async fn reset(&self) -> OrchestratorResult<()> {
        self.call(|reply| Command::Reset { reply }).await
    }

    /// Open a direct subscription: every event, in order, until dropped.
    pub async fn subscribe_direct(&self) -> OrchestratorResult<DirectSubscription> {
        self.call(|reply| Command::SubscribeDirect { reply }).await
    }

    /// Open a stream subscription: a bounded queue with a drop policy,
    /// closing itself on a terminal event.
    pub async fn subscribe_stream(&self, opts: SubscribeOpts) -> OrchestratorResult<StreamSubscription> {
        self.call(|reply| Command::SubscribeStream { opts, reply }).await
    }

    /// Switch the active provider/model, recording a model-change entry.
    pub async fn switch_model(&self, provider: impl Into<String>, model: impl Into<String>) -> OrchestratorResult<()> {
        let provider = provider.into();
        let model = model.into();
        self.call(|reply| Command::SwitchModel { provider, model, reply }).await
    }

    /// Change the reasoning effort, recording a thinking-level entry.
    pub async fn set_thinking_level(&self, level: ThinkingLevel) -> OrchestratorResult<()> {
        self.call(|reply| Command::SetThinkingLevel { level, reply }).await
    }

    /// Run compaction in-band and apply the result.
    pub async fn compact(&self, opts: CompactOpts) -> OrchestratorResult<CompactOutcome> {
        self.call(|reply| Command::Compact { opts, reply }).await
    }

    /// Move the leaf cursor to `entry_id` and rebuild the driver's message
    /// list from the log.
    pub async fn navigate_tree(&self, entry_id: impl Into<String>, opts: NavigateOpts) -> OrchestratorResult<()> {
        let entry_id = entry_id.into();
        self.call(|reply| Command::NavigateTree { entry_id, opts, reply }).await
    }

    /// Re-discover extensions, rebuild the tool set, and publish a new
    /// status report.
    pub async fn reload_extensions(&self) -> OrchestratorResult<()> {
        self.call(|reply| Command::ReloadExtensions { reply }).await
    }

    /// Persist a branch-summary entry for the current branch.
    pub async fn summarize_current_branch(&self, opts: SummarizeOpts) -> OrchestratorResult<BranchSummaryOutcome> {
        self.call(|reply| Command::SummarizeCurrentBranch { opts, reply }).await
    }
}

/// Convenience re-export so callers building an [`ActorConfig`] don't need
/// a separate import for the compaction crate's config type.
pub type CompactionSettings = CompactionConfig;

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_compaction::CompactionResult;
    use astrid_extensions::ExtensionModule;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    struct NullDriver {
        prompts: Mutex<Vec<String>>,
        events_tx: mpsc::Sender<crate::driver::DriverEvent>,
    }

    #[async_trait]
    impl SessionDriver for NullDriver {
        async fn prompt(&self, text: String, _images: Vec<ContentBlock>) -> OrchestratorResult<()> {
            self.prompts.lock().unwrap().push(text);
            let _ = self
                .events_tx
                .send(crate::driver::DriverEvent::AgentEnd { messages: Vec::new() })
                .await;
            Ok(())
        }
        async fn steer(&self, _text: String) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn follow_up(&self, _text: String) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn abort(&self) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn set_tools(&self, _tools: Vec<String>) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn set_model(&self, _provider: String, _model: String) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn set_thinking_level(&self, _level: ThinkingLevel) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn set_system_prompt(&self, _prompt: String) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn continue_run(&self) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn wait_for_idle(&self, _timeout: std::time::Duration) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn reset(&self) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn replace_messages(&self, _messages: Vec<astrid_session::Message>) -> OrchestratorResult<()> {
            Ok(())
        }
    }

    struct StubSummarizer;

    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, _messages: &[astrid_session::Message]) -> CompactionResult<String> {
            Ok("summary".to_string())
        }
    }

    struct NullLoader;

    impl ExtensionLoader for NullLoader {
        fn load(&self, _path: &Path) -> Result<Option<std::sync::Arc<dyn ExtensionModule>>, String> {
            Ok(None)
        }
    }

    fn spawn_test_orchestrator() -> Orchestrator {
        let log = SessionLog::new("/tmp", None, None, 0);
        let (events_tx, events_rx) = mpsc::channel(16);
        let driver = Arc::new(NullDriver {
            prompts: Mutex::new(Vec::new()),
            events_tx,
        });
        let handle = DriverHandle { driver, events: events_rx };
        Orchestrator::spawn(
            log,
            handle,
            Arc::new(StubSummarizer),
            Arc::new(NullLoader),
            ActorConfig {
                extension_paths: Vec::new(),
                builtin_tool_names: Vec::new(),
                compaction: CompactionConfig::default(),
                reset_idle_timeout: std::time::Duration::from_secs(5),
            },
        )
    }

    #[tokio::test]
    async fn prompt_then_agent_end_round_trips() {
        let orch = spawn_test_orchestrator();
        let mut sub = orch.subscribe_direct().await.unwrap();
        orch.prompt("hello", Vec::new()).await.unwrap();
        let (_, event) = sub.events.recv().await.unwrap();
        assert!(matches!(event, crate::event::OrchestratorEvent::AgentStart));
    }

    #[tokio::test]
    async fn second_prompt_before_dispatch_is_rejected() {
        let orch = spawn_test_orchestrator();
        orch.prompt("first", Vec::new()).await.unwrap();
        let err = orch.prompt("second", Vec::new()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::AlreadyStreaming));
    }
}
