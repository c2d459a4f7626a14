//! The orchestrator's single-writer actor: every command in
//! [`crate::command::Command`] is handled here, one at a time, so the
//! session log, the driver's turn state, and the extension host never
//! race each other. Modeled on `astrid_rungraph::writer::Writer`.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use astrid_compaction::{CompactionConfig, Summarizer};
use astrid_extensions::reload::ExtensionHost;
use astrid_session::{ContentBlock, EntryPayload, Message, SessionEntry, SessionLog, ThinkingLevel};
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tracing::{debug, warn};

use crate::command::{BranchSummaryOutcome, Command, CompactOutcome};
use crate::driver::{DriverEvent, SessionDriver};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::event::{CancelReason, EventHub, OrchestratorEvent};
use crate::extensions::ExtensionLoader;

/// The ~10ms window `prompt` defers dispatch by, to let an immediate
/// `steer`/`follow_up`/`abort` race in before the driver actually starts.
const DEFER_PROMPT_DELAY: Duration = Duration::from_millis(10);

struct DeferredPrompt {
    text: String,
    images: Vec<ContentBlock>,
}

/// Configuration the actor is constructed with; distinct from the
/// per-call [`crate::command::CompactOpts`] etc.
pub struct ActorConfig {
    /// Paths scanned for extension source files on `reload_extensions`.
    pub extension_paths: Vec<PathBuf>,
    /// Built-in tool names, in fixed precedence order.
    pub builtin_tool_names: Vec<String>,
    /// Trigger thresholds and cut-point tuning for the compaction pipeline.
    pub compaction: CompactionConfig,
    /// Bound on `wait_for_idle` during `reset`.
    pub reset_idle_timeout: Duration,
}

pub(crate) struct OrchestratorActor {
    log: SessionLog,
    driver: Arc<dyn SessionDriver>,
    driver_events: mpsc::Receiver<DriverEvent>,
    hub: Arc<EventHub>,
    summarizer: Arc<dyn Summarizer>,
    loader: Arc<dyn ExtensionLoader>,
    extension_host: ExtensionHost,
    config: ActorConfig,
    streaming: bool,
    current_turn_id: Option<String>,
    deferred: Option<DeferredPrompt>,
    overflow_tracker: astrid_compaction::OverflowRecoveryTracker,
}

struct HubPublisher<'a>(&'a EventHub);

impl astrid_extensions::reload::StatusPublisher for HubPublisher<'_> {
    fn publish(&self, report: &astrid_extensions::reload::StatusReport) {
        self.0.publish(OrchestratorEvent::ExtensionStatusReport(report.clone()));
    }
}

impl OrchestratorActor {
    pub(crate) fn new(
        log: SessionLog,
        driver: Arc<dyn SessionDriver>,
        driver_events: mpsc::Receiver<DriverEvent>,
        hub: Arc<EventHub>,
        summarizer: Arc<dyn Summarizer>,
        loader: Arc<dyn ExtensionLoader>,
        config: ActorConfig,
    ) -> Self {
        Self {
            log,
            driver,
            driver_events,
            hub,
            summarizer,
            loader,
            extension_host: ExtensionHost::new(),
            config,
            streaming: false,
            current_turn_id: None,
            deferred: None,
            overflow_tracker: astrid_compaction::OverflowRecoveryTracker::new(),
        }
    }

    pub(crate) async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        let mut deferred_sleep: Option<Pin<Box<Sleep>>> = None;
        loop {
            let sleep_armed = deferred_sleep.is_some();
            tokio::select! {
                biased;
                maybe_cmd = cmd_rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => self.handle_command(cmd, &mut deferred_sleep).await,
                        None => break,
                    }
                }
                maybe_event = self.driver_events.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_driver_event(event).await,
                        None => break,
                    }
                }
                () = sleep_or_pending(&mut deferred_sleep), if sleep_armed => {
                    self.dispatch_deferred().await;
                }
            }
        }
        debug!("orchestrator actor exiting");
    }

    async fn handle_command(&mut self, cmd: Command, deferred_sleep: &mut Option<Pin<Box<Sleep>>>) {
        match cmd {
            Command::Prompt { text, images, reply } => {
                let result = self.cmd_prompt(text, images, deferred_sleep);
                let _ = reply.send(result);
            },
            Command::Steer { text, reply } => {
                let result = self.driver.steer(text).await;
                let _ = reply.send(result);
            },
            Command::FollowUp { text, reply } => {
                let result = self.driver.follow_up(text).await;
                let _ = reply.send(result);
            },
            Command::Abort { reply } => {
                let result = self.cmd_abort(deferred_sleep).await;
                let _ = reply.send(result);
            },
            Command::Reset { reply } => {
                let result = self.cmd_reset(deferred_sleep).await;
                let _ = reply.send(result);
            },
            Command::SubscribeDirect { reply } => {
                let _ = reply.send(Ok(self.hub.subscribe_direct()));
            },
            Command::SubscribeStream { opts, reply } => {
                let _ = reply.send(Ok(self.hub.subscribe_stream(opts)));
            },
            Command::SwitchModel { provider, model, reply } => {
                let result = self.cmd_switch_model(provider, model).await;
                let _ = reply.send(result);
            },
            Command::SetThinkingLevel { level, reply } => {
                let result = self.cmd_set_thinking_level(level).await;
                let _ = reply.send(result);
            },
            Command::Compact { opts, reply } => {
                let result = self.cmd_compact(opts).await;
                let _ = reply.send(result);
            },
            Command::NavigateTree { entry_id, opts, reply } => {
                let result = self.cmd_navigate_tree(entry_id, opts).await;
                let _ = reply.send(result);
            },
            Command::ReloadExtensions { reply } => {
                let result = self.cmd_reload_extensions();
                let _ = reply.send(result);
            },
            Command::SummarizeCurrentBranch { opts, reply } => {
                let result = self.cmd_summarize_current_branch(opts).await;
                let _ = reply.send(result);
            },
        }
    }

    fn cmd_prompt(&mut self, text: String, images: Vec<ContentBlock>, deferred_sleep: &mut Option<Pin<Box<Sleep>>>) -> OrchestratorResult<()> {
        if self.streaming || self.deferred.is_some() {
            return Err(OrchestratorError::AlreadyStreaming);
        }
        let timestamp = now_ms();
        let message = Message::User {
            timestamp,
            content: images.iter().cloned().chain(std::iter::once(ContentBlock::text(text.clone()))).collect(),
        };
        self.log.append(SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp,
            payload: EntryPayload::Message { message },
        })?;
        self.deferred = Some(DeferredPrompt { text, images });
        *deferred_sleep = Some(Box::pin(tokio::time::sleep(DEFER_PROMPT_DELAY)));
        Ok(())
    }

    async fn dispatch_deferred(&mut self) {
        let Some(deferred) = self.deferred.take() else { return };
        self.streaming = true;
        let turn_id = self.log.leaf_id().unwrap_or_default().to_string();
        self.overflow_tracker.clear(&turn_id);
        self.current_turn_id = Some(turn_id);
        self.hub.publish(OrchestratorEvent::AgentStart);
        if let Err(e) = self.driver.prompt(deferred.text, deferred.images).await {
            warn!(error = %e, "driver rejected deferred prompt dispatch");
            self.streaming = false;
            self.hub.publish(OrchestratorEvent::Error {
                reason: e.to_string(),
                partial: Vec::new(),
            });
        }
    }

    async fn cmd_abort(&mut self, deferred_sleep: &mut Option<Pin<Box<Sleep>>>) -> OrchestratorResult<()> {
        let had_deferred = self.deferred.take().is_some();
        *deferred_sleep = None;
        self.driver.abort().await?;
        if had_deferred && !self.streaming {
            self.hub.publish(OrchestratorEvent::Canceled {
                reason: CancelReason::AssistantAborted,
            });
        }
        Ok(())
    }

    async fn cmd_reset(&mut self, deferred_sleep: &mut Option<Pin<Box<Sleep>>>) -> OrchestratorResult<()> {
        self.deferred = None;
        *deferred_sleep = None;
        if self.streaming {
            self.hub.publish(OrchestratorEvent::Canceled { reason: CancelReason::Reset });
        }
        self.driver.reset().await?;
        self.driver
            .wait_for_idle(self.config.reset_idle_timeout)
            .await
            .map_err(|_| OrchestratorError::Timeout("driver idle on reset".to_string()))?;
        self.streaming = false;
        self.current_turn_id = None;
        let context = self.log.build_context(None);
        self.driver.replace_messages(context.messages).await?;
        Ok(())
    }

    async fn cmd_switch_model(&mut self, provider: String, model: String) -> OrchestratorResult<()> {
        self.driver.set_model(provider.clone(), model.clone()).await?;
        self.log.append(SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp: now_ms(),
            payload: EntryPayload::ModelChange { provider, model },
        })?;
        Ok(())
    }

    async fn cmd_set_thinking_level(&mut self, level: ThinkingLevel) -> OrchestratorResult<()> {
        self.driver.set_thinking_level(level).await?;
        self.log.append(SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp: now_ms(),
            payload: EntryPayload::ThinkingLevelChange { level },
        })?;
        Ok(())
    }

    async fn cmd_compact(&mut self, opts: crate::command::CompactOpts) -> OrchestratorResult<CompactOutcome> {
        let entry_id = match opts.summary {
            Some(summary) => self.apply_compaction_with_summary(summary, opts.force)?,
            None => astrid_compaction::compact(&mut self.log, self.summarizer.as_ref(), &self.config.compaction, opts.force)
                .await
                .map_err(|e| match e {
                    astrid_compaction::CompactionError::CannotCompact => OrchestratorError::CannotCompact,
                    other => OrchestratorError::Compaction(other),
                })?,
        };
        let Some(EntryPayload::Compaction { tokens_before, .. }) = self.log.get(&entry_id).map(|e| e.payload.clone()) else {
            return Err(OrchestratorError::Log(astrid_session::SessionLogError::EntryNotFound(entry_id)));
        };
        let context = self.log.build_context(None);
        self.driver.replace_messages(context.messages).await?;
        self.hub.publish(OrchestratorEvent::CompactionComplete {
            entry_id: entry_id.clone(),
            tokens_before,
        });
        Ok(CompactOutcome { entry_id, tokens_before })
    }

    fn apply_compaction_with_summary(&mut self, summary: String, force: bool) -> OrchestratorResult<String> {
        let path = self.log.branch(None);
        let cut_id = astrid_compaction::find_cut_point(&path, &self.config.compaction, force).map_err(|e| match e {
            astrid_compaction::CompactionError::CannotCompact => OrchestratorError::CannotCompact,
            other => OrchestratorError::Compaction(other),
        })?;
        let cut_pos = path.iter().position(|e| e.id == cut_id).unwrap_or(path.len());
        let tokens_before: usize = path[..cut_pos].iter().map(|e| astrid_compaction::estimate::estimate_entry_tokens(e) as usize).sum();
        let entry_id = self.log.append(SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp: now_ms(),
            payload: EntryPayload::Compaction {
                summary,
                first_kept_entry_id: cut_id,
                tokens_before,
                details: astrid_session::SummaryDetails::default(),
                from_hook: false,
            },
        })?;
        Ok(entry_id)
    }

    async fn cmd_navigate_tree(&mut self, entry_id: String, opts: crate::command::NavigateOpts) -> OrchestratorResult<()> {
        if self.log.get(&entry_id).is_none() {
            return Err(OrchestratorError::EntryNotFound(entry_id));
        }
        let previous_leaf = self.log.leaf_id().map(str::to_string);
        let switching_branch = previous_leaf.as_deref() != Some(entry_id.as_str());

        if switching_branch && opts.summarize_abandoned {
            if let Some(from_id) = previous_leaf {
                self.spawn_abandoned_branch_summary(from_id);
            }
        }

        self.log.set_leaf(&entry_id)?;
        let context = self.log.build_context(None);
        self.driver.replace_messages(context.messages).await?;
        Ok(())
    }

    fn spawn_abandoned_branch_summary(&self, from_id: String) {
        let summarizer = self.summarizer.clone();
        let hub = self.hub.clone();
        let span = self.log.branch(Some(&from_id)).into_iter().cloned().collect::<Vec<_>>();
        tokio::spawn(async move {
            let messages: Vec<Message> = span
                .iter()
                .filter_map(|e| match &e.payload {
                    EntryPayload::Message { message } => Some(message.clone()),
                    _ => None,
                })
                .collect();
            if messages.is_empty() {
                return;
            }
            match summarizer.summarize(&messages).await {
                Ok(summary) => {
                    debug!(from_id = from_id.as_str(), "abandoned branch summarized");
                    hub.publish(OrchestratorEvent::BranchSummarized {
                        from_id,
                        entry_id: String::new(),
                    });
                    let _ = summary;
                },
                Err(e) => warn!(error = %e, "abandoned branch summarization failed"),
            }
        });
    }

    fn cmd_reload_extensions(&mut self) -> OrchestratorResult<()> {
        if self.streaming {
            return Err(OrchestratorError::AlreadyStreaming);
        }
        let loader = self.loader.clone();
        let publisher = HubPublisher(&self.hub);
        self.extension_host.reload(
            &self.config.extension_paths,
            move |path| loader.load(path),
            &self.config.builtin_tool_names,
            &publisher,
        );
        Ok(())
    }

    async fn cmd_summarize_current_branch(&mut self, opts: crate::command::SummarizeOpts) -> OrchestratorResult<BranchSummaryOutcome> {
        let path = self.log.branch(None);
        if !path.iter().any(|e| e.is_context_bearing()) {
            return Err(OrchestratorError::EmptyBranch);
        }
        let messages: Vec<Message> = path
            .iter()
            .filter_map(|e| match &e.payload {
                EntryPayload::Message { message } => Some(message.clone()),
                _ => None,
            })
            .collect();
        let _ = &opts.custom_instructions;
        let summary = self
            .summarizer
            .summarize(&messages)
            .await
            .map_err(OrchestratorError::Compaction)?;
        let from_id = self.log.leaf_id().unwrap_or_default().to_string();
        let entry_id = self.log.append(SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp: now_ms(),
            payload: EntryPayload::BranchSummary {
                from_id: from_id.clone(),
                summary,
                details: astrid_session::SummaryDetails::default(),
                from_hook: false,
            },
        })?;
        self.hub.publish(OrchestratorEvent::BranchSummarized {
            from_id,
            entry_id: entry_id.clone(),
        });
        Ok(BranchSummaryOutcome { entry_id })
    }

    async fn handle_driver_event(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::AgentStart => self.hub.publish(OrchestratorEvent::AgentStart),
            DriverEvent::MessageStart => self.hub.publish(OrchestratorEvent::MessageStart),
            DriverEvent::MessageEnd { message } => {
                self.persist_message(&message);
                self.hub.publish(OrchestratorEvent::MessageEnd { message });
            },
            DriverEvent::TurnEnd => self.hub.publish(OrchestratorEvent::TurnEnd),
            DriverEvent::ToolExecutionStart { tool_call_id, tool_name } => {
                self.hub.publish(OrchestratorEvent::ToolExecutionStart { tool_call_id, tool_name });
            },
            DriverEvent::ToolExecutionEnd { tool_call_id, is_error } => {
                self.hub.publish(OrchestratorEvent::ToolExecutionEnd { tool_call_id, is_error });
            },
            DriverEvent::AgentEnd { messages } => {
                self.streaming = false;
                self.current_turn_id = None;
                self.hub.publish(OrchestratorEvent::AgentEnd { messages });
            },
            DriverEvent::Error { reason, partial } => {
                self.maybe_recover_from_overflow(reason, partial).await;
            },
        }
    }

    fn persist_message(&mut self, message: &Message) {
        let timestamp = message.timestamp();
        if let Err(e) = self.log.append(SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp,
            payload: EntryPayload::Message { message: message.clone() },
        }) {
            warn!(error = %e, "failed to persist observed message");
        }
    }

    async fn maybe_recover_from_overflow(&mut self, reason: String, partial: Vec<Message>) {
        let turn_id = self.current_turn_id.clone().unwrap_or_default();
        if astrid_compaction::is_overflow_error(&reason) {
            let outcome = astrid_compaction::attempt_recovery(&mut self.overflow_tracker, &turn_id, &mut self.log, self.summarizer.as_ref(), &self.config.compaction).await;
            if let astrid_compaction::RecoveryOutcome::Recovered { compaction_entry_id } = outcome {
                let context = self.log.build_context(None);
                if self.driver.replace_messages(context.messages).await.is_ok()
                    && self.driver.wait_for_idle(self.config.reset_idle_timeout).await.is_ok()
                {
                    self.hub.publish(OrchestratorEvent::CompactionComplete {
                        entry_id: compaction_entry_id,
                        tokens_before: 0,
                    });
                    return;
                }
            }
        }
        self.streaming = false;
        self.current_turn_id = None;
        self.hub.publish(OrchestratorEvent::Error { reason, partial });
    }
}

fn sleep_or_pending(slot: &mut Option<Pin<Box<Sleep>>>) -> impl std::future::Future<Output = ()> + '_ {
    std::future::poll_fn(move |cx| match slot.as_mut() {
        Some(sleep) => sleep.as_mut().poll(cx),
        None => std::task::Poll::Pending,
    })
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
