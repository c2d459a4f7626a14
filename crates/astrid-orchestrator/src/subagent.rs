//! Subagent coordinator (spec §4.4): spawn N child sessions with
//! per-child prompts, monitor each against a shared deadline, and collect
//! results in submission order.
//!
//! Grounded on `astrid-runtime`'s `SubAgentPool`/`SubAgentHandle`
//! bookkeeping, but lineage and lifecycle are tracked on the process-wide
//! [`astrid_rungraph::RunGraph`] instead of a pool-local map, so a child's
//! status is visible the same way any other run's is.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use astrid_budget::BudgetTracker;
use astrid_lanequeue::{JobMeta, LaneError, LaneKey, LaneQueue};
use astrid_rungraph::{NewRunAttrs, RunGraph, RunStatus, WaitMode};
use astrid_session::{Message, ThinkingLevel};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Lane class used for every subagent fan-out. Callers must configure a
/// cap for this class on the [`LaneQueue`] they construct — left unset,
/// [`astrid_lanequeue::LaneCaps`] defaults a class to 1, which would
/// serialize what the caller asked to run in parallel.
pub const SUBAGENT_LANE_CLASS: &str = "subagent_fanout";

use crate::error::SubagentStatus;
use crate::event::OrchestratorEvent;
use crate::orchestrator::Orchestrator;

/// One requested child run.
#[derive(Debug, Clone)]
pub struct SubagentSpec {
    /// Caller-chosen key this result is returned under; need not be
    /// globally unique, only unique within one `run_subagents` call.
    pub id: String,
    /// A named subagent whose stored prompt prefix should be resolved
    /// and prepended to `prompt`, or `None` for an ad-hoc child.
    pub subagent_id: Option<String>,
    /// The task prompt.
    pub prompt: String,
    /// Working directory inherited from the parent unless overridden.
    pub cwd: String,
    /// Provider/model inherited from the parent unless overridden.
    pub model: (String, String),
    /// Reasoning level inherited from the parent unless overridden.
    pub thinking_level: ThinkingLevel,
    /// Opaque settings carried through to the child's session (policy,
    /// tool allowlist, etc.) — interpreted by whatever `spawner` is
    /// plugged in, not by this crate.
    pub settings: serde_json::Value,
}

/// Result of one child run.
#[derive(Debug, Clone)]
pub struct SubagentResult {
    /// Echoes [`SubagentSpec::id`].
    pub id: String,
    /// How the run ended.
    pub status: SubagentStatus,
    /// The final assistant text, if `status` is `Completed`.
    pub result: Option<String>,
    /// A human-readable failure reason, if `status` is `Error` or `Timeout`.
    pub error: Option<String>,
    /// The child's own session id, for lineage/debugging.
    pub session_id: Option<String>,
}

/// Resolves a named subagent id to its stored prompt prefix.
pub trait SubagentCatalog: Send + Sync {
    /// Look up the prompt prefix for `subagent_id`, or `None` if unknown
    /// (the caller's raw prompt is used as-is).
    fn resolve_prompt_prefix(&self, subagent_id: &str) -> Option<String>;
}

/// A child session, as handed back by a [`ChildSessionSpawner`]: an
/// orchestrator handle to drive it, and the process monitor task that
/// stands in for the coordinator's "demonitor on cleanup" contract —
/// if it resolves before the orchestrator reports a terminal event, the
/// child is considered to have crashed out from under its own driver.
pub struct ChildSession {
    /// This child's own session id.
    pub session_id: String,
    /// Handle to drive and subscribe to the child.
    pub orchestrator: Orchestrator,
    /// Resolves when the child's underlying process/task exits, however
    /// that happens; never resolving until actually gone.
    pub monitor: tokio::task::JoinHandle<()>,
}

/// Starts a child session inheriting cwd/model/thinking-level/settings
/// from the parent, linked to `parent_run_id` for lineage. Defined as a
/// seam: this crate does not know how to provision a driver for a child
/// (that's wired the same way the top-level orchestrator's driver is).
#[async_trait::async_trait]
pub trait ChildSessionSpawner: Send + Sync {
    /// Spawn and return a ready-to-prompt child session.
    async fn spawn_child(&self, parent_run_id: &str, spec: &SubagentSpec, resolved_prompt: &str) -> Result<ChildSession, String>;
}

/// Run every spec's child session, in parallel, returning results in the
/// original spec order once all have reached a terminal state or the
/// shared `timeout` elapses, whichever comes first (spec §4.4).
///
/// # Errors
///
/// This function does not itself fail; individual spec failures are
/// reported per-result. It can only panic if `run_graph` bookkeeping
/// calls are given a caller-id collision, which `run_subagents` avoids by
/// minting its own ids.
pub async fn run_subagents(
    specs: Vec<SubagentSpec>,
    timeout: Duration,
    parent_run_id: &str,
    run_graph: &RunGraph,
    budget: &BudgetTracker,
    lane_queue: &LaneQueue,
    catalog: &dyn SubagentCatalog,
    spawner: &Arc<dyn ChildSessionSpawner>,
) -> Vec<SubagentResult> {
    let lane = LaneKey::tuple(SUBAGENT_LANE_CLASS, parent_run_id);
    let order: Vec<String> = specs.iter().map(|s| s.id.clone()).collect();
    let results: Arc<Mutex<HashMap<String, SubagentResult>>> = Arc::new(Mutex::new(HashMap::new()));
    let mut run_ids = Vec::with_capacity(specs.len());
    let mut handles = Vec::with_capacity(specs.len());

    for spec in specs {
        let resolved_prompt = match &spec.subagent_id {
            Some(named) => match catalog.resolve_prompt_prefix(named) {
                Some(prefix) => format!("{prefix}\n\n{}", spec.prompt),
                None => spec.prompt.clone(),
            },
            None => spec.prompt.clone(),
        };

        let run_id = match run_graph
            .new_run(NewRunAttrs {
                parent: Some(parent_run_id.to_string()),
                meta: serde_json::json!({"subagent_spec_id": spec.id, "cwd": spec.cwd}),
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                results.lock().await.insert(
                    spec.id.clone(),
                    SubagentResult {
                        id: spec.id.clone(),
                        status: SubagentStatus::Error,
                        result: None,
                        error: Some(format!("failed to register run: {e}")),
                        session_id: None,
                    },
                );
                continue;
            },
        };
        if let Err(e) = run_graph.add_child(parent_run_id, &run_id).await {
            warn!(error = %e, run_id = run_id.as_str(), "failed to link subagent run under parent");
        }
        if let Ok(Err(axis)) = budget.check_subagent_spawn(parent_run_id) {
            run_graph.fail(&run_id, format!("budget exceeded: {axis:?}")).await.ok();
            results.lock().await.insert(
                spec.id.clone(),
                SubagentResult {
                    id: spec.id.clone(),
                    status: SubagentStatus::Error,
                    result: None,
                    error: Some(format!("budget exceeded: {axis:?}")),
                    session_id: None,
                },
            );
            continue;
        }

        run_ids.push(run_id.clone());
        let spec_id = spec.id.clone();
        let results = results.clone();
        let run_graph = run_graph.clone();
        let lane_queue = lane_queue.clone();
        let lane = lane.clone();
        let spawner = Arc::clone(spawner);
        let parent_run_id = parent_run_id.to_string();

        // The actual process spawn + drive is the expensive, genuinely
        // concurrent part; it runs inside the lane queue so a fan-out
        // never exceeds the caller's configured per-parent cap (spec
        // §4.3/§4.4: coordinator uses the lane queue to fan out child
        // sessions).
        let handle = tokio::spawn(async move {
            let job_run_id = run_id.clone();
            let job_run_graph = run_graph.clone();
            let lane_result: Result<(SubagentStatus, Option<String>, Option<String>, Option<String>), LaneError> = lane_queue
                .run(
                    lane,
                    move || async move {
                        let child = match spawner.spawn_child(&parent_run_id, &spec, &resolved_prompt).await {
                            Ok(child) => child,
                            Err(e) => {
                                job_run_graph.fail(&job_run_id, e.clone()).await.ok();
                                return Ok((SubagentStatus::Error, None, Some(e), None));
                            },
                        };
                        job_run_graph.mark_running(&job_run_id).await.ok();
                        let session_id = child.session_id.clone();
                        let mut child = child;
                        let outcome = drive_child(&mut child, &job_run_id, &job_run_graph).await;
                        child.monitor.abort();
                        Ok(match outcome {
                            DriveOutcome::Completed(text) => (SubagentStatus::Completed, Some(text), None, Some(session_id)),
                            DriveOutcome::Error(reason) => (SubagentStatus::Error, None, Some(reason), Some(session_id)),
                        })
                    },
                    JobMeta {
                        timeout: None,
                        label: Some(spec_id.clone()),
                    },
                )
                .await;

            let result = match lane_result {
                Ok((status, result, error, session_id)) => SubagentResult {
                    id: spec_id.clone(),
                    status,
                    result,
                    error,
                    session_id,
                },
                Err(lane_err) => {
                    run_graph.fail(&run_id, lane_err.to_string()).await.ok();
                    SubagentResult {
                        id: spec_id.clone(),
                        status: SubagentStatus::Error,
                        result: None,
                        error: Some(lane_err.to_string()),
                        session_id: None,
                    }
                },
            };
            results.lock().await.insert(spec_id, result);
        });
        handles.push(handle);
    }

    let deadline_result = if run_ids.is_empty() {
        Ok(())
    } else {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        run_graph.await_runs(&run_ids, WaitMode::All, timeout_ms).await.map(|_| ())
    };

    if deadline_result.is_err() {
        debug!(count = run_ids.len(), "subagent deadline elapsed, marking stragglers as timed out");
        for handle in &handles {
            handle.abort();
        }
        for run_id in &run_ids {
            if let Some(record) = run_graph.get(run_id) {
                if !record.status.is_terminal() {
                    run_graph.fail(run_id, "subagent deadline exceeded").await.ok();
                }
            }
        }
    } else {
        for handle in handles {
            let _ = handle.await;
        }
    }

    let guard = results.lock().await;
    order
        .into_iter()
        .map(|id| {
            guard.get(&id).cloned().unwrap_or(SubagentResult {
                id,
                status: SubagentStatus::Timeout,
                result: None,
                error: Some("deadline exceeded before the child reported a result".to_string()),
                session_id: None,
            })
        })
        .collect()
}

enum DriveOutcome {
    Completed(String),
    Error(String),
}

async fn drive_child(child: &mut ChildSession, run_id: &str, run_graph: &RunGraph) -> DriveOutcome {
    let Ok(mut sub) = child.orchestrator.subscribe_direct().await else {
        return DriveOutcome::Error("failed to subscribe to child session events".to_string());
    };
    loop {
        tokio::select! {
            biased;
            // `JoinHandle<T>` is `Unpin`, so the stdlib's blanket `&mut F`
            // `Future` impl lets us race it here directly, re-borrowed
            // fresh each loop iteration.
            _ = &mut child.monitor => {
                return DriveOutcome::Error("child process monitor reported it went down".to_string());
            }
            event = sub.events.recv() => {
                match event {
                    Ok((_, OrchestratorEvent::AgentEnd { messages })) => {
                        let text = last_assistant_text(&messages);
                        let _ = run_graph.finish(run_id, serde_json::json!({"text": text})).await;
                        return DriveOutcome::Completed(text);
                    }
                    Ok((_, OrchestratorEvent::Error { reason, .. })) => {
                        let _ = run_graph.fail(run_id, reason.clone()).await;
                        return DriveOutcome::Error(reason);
                    }
                    Ok((_, OrchestratorEvent::Canceled { .. })) => {
                        let _ = run_graph.fail(run_id, "child session was cancelled").await;
                        return DriveOutcome::Error("child session was cancelled".to_string());
                    }
                    Ok(_) => continue,
                    Err(_) => return DriveOutcome::Error("child event channel closed unexpectedly".to_string()),
                }
            }
        }
    }
}

fn last_assistant_text(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .find_map(|m| match m {
            Message::Assistant { content, .. } => Some(content.iter().filter_map(|b| b.as_text()).collect::<Vec<_>>().join("\n")),
            _ => None,
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use astrid_budget::BudgetOpts;
    use astrid_compaction::{CompactionConfig, CompactionResult, Summarizer};
    use astrid_extensions::ExtensionModule;
    use astrid_lanequeue::LaneCaps;
    use astrid_session::{ContentBlock, SessionLog};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::actor::ActorConfig;
    use crate::driver::{DriverEvent, DriverHandle, SessionDriver};
    use crate::error::OrchestratorResult;

    struct NullDriver {
        events_tx: mpsc::Sender<DriverEvent>,
    }

    #[async_trait]
    impl SessionDriver for NullDriver {
        async fn prompt(&self, _text: String, _images: Vec<ContentBlock>) -> OrchestratorResult<()> {
            let _ = self.events_tx.send(DriverEvent::AgentEnd { messages: Vec::new() }).await;
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
        async fn wait_for_idle(&self, _timeout: Duration) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn reset(&self) -> OrchestratorResult<()> {
            Ok(())
        }
        async fn replace_messages(&self, _messages: Vec<Message>) -> OrchestratorResult<()> {
            Ok(())
        }
    }

    struct StubSummarizer;

    #[async_trait]
    impl Summarizer for StubSummarizer {
        async fn summarize(&self, _messages: &[Message]) -> CompactionResult<String> {
            Ok("summary".to_string())
        }
    }

    struct NullLoader;

    impl crate::extensions::ExtensionLoader for NullLoader {
        fn load(&self, _path: &Path) -> Result<Option<Arc<dyn ExtensionModule>>, String> {
            Ok(None)
        }
    }

    fn spawn_child_orchestrator() -> Orchestrator {
        let log = SessionLog::new("/tmp", None, None, 0);
        let (events_tx, events_rx) = mpsc::channel(16);
        let driver = Arc::new(NullDriver { events_tx });
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
                reset_idle_timeout: Duration::from_secs(5),
            },
        )
    }

    struct TestCatalog;

    impl SubagentCatalog for TestCatalog {
        fn resolve_prompt_prefix(&self, _subagent_id: &str) -> Option<String> {
            None
        }
    }

    struct TestSpawner;

    #[async_trait]
    impl ChildSessionSpawner for TestSpawner {
        async fn spawn_child(&self, _parent_run_id: &str, spec: &SubagentSpec, resolved_prompt: &str) -> Result<ChildSession, String> {
            let orch = spawn_child_orchestrator();
            orch.prompt(resolved_prompt.to_string(), Vec::new()).await.map_err(|e| e.to_string())?;
            let monitor = tokio::spawn(std::future::pending::<()>());
            Ok(ChildSession {
                session_id: format!("child-{}", spec.id),
                orchestrator: orch,
                monitor,
            })
        }
    }

    fn spec(id: &str) -> SubagentSpec {
        SubagentSpec {
            id: id.to_string(),
            subagent_id: None,
            prompt: format!("do {id}"),
            cwd: "/tmp".to_string(),
            model: ("anthropic".to_string(), "test-model".to_string()),
            thinking_level: ThinkingLevel::Medium,
            settings: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn fan_out_completes_in_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let run_graph = RunGraph::open(dir.path()).unwrap();
        let budget = BudgetTracker::new();
        budget.create("parent", BudgetOpts::default(), 0).unwrap();
        let lane_queue = LaneQueue::new(LaneCaps::new().with_cap(SUBAGENT_LANE_CLASS, 4));
        let spawner: Arc<dyn ChildSessionSpawner> = Arc::new(TestSpawner);

        let specs = vec![spec("a"), spec("b"), spec("c")];
        let results = run_subagents(specs, Duration::from_secs(5), "parent", &run_graph, &budget, &lane_queue, &TestCatalog, &spawner).await;

        assert_eq!(results.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
        for r in &results {
            assert_eq!(r.status, SubagentStatus::Completed, "{:?}", r.error);
        }
    }

    #[tokio::test]
    async fn lane_cap_of_one_serializes_children() {
        let dir = tempfile::tempdir().unwrap();
        let run_graph = RunGraph::open(dir.path()).unwrap();
        let budget = BudgetTracker::new();
        budget.create("parent", BudgetOpts::default(), 0).unwrap();
        // Default cap is 1: every child shares the same lane, so the lane
        // queue admits them one at a time (spec §4.3 cap invariant), not
        // the true parallelism a higher cap would allow.
        let lane_queue = LaneQueue::new(LaneCaps::new());
        let spawner: Arc<dyn ChildSessionSpawner> = Arc::new(TestSpawner);

        let specs = vec![spec("a"), spec("b")];
        let results = run_subagents(specs, Duration::from_secs(5), "parent", &run_graph, &budget, &lane_queue, &TestCatalog, &spawner).await;

        assert_eq!(results.len(), 2);
        for r in &results {
            assert_eq!(r.status, SubagentStatus::Completed, "{:?}", r.error);
        }
    }

    #[tokio::test]
    async fn budget_rejection_marks_run_as_error_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let run_graph = RunGraph::open(dir.path()).unwrap();
        let budget = BudgetTracker::new();
        budget
            .create(
                "parent",
                BudgetOpts {
                    max_children: Some(0),
                    ..Default::default()
                },
                0,
            )
            .unwrap();
        let lane_queue = LaneQueue::new(LaneCaps::new().with_cap(SUBAGENT_LANE_CLASS, 4));
        let spawner: Arc<dyn ChildSessionSpawner> = Arc::new(TestSpawner);

        let results = run_subagents(vec![spec("a")], Duration::from_secs(5), "parent", &run_graph, &budget, &lane_queue, &TestCatalog, &spawner).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, SubagentStatus::Error);
        assert!(results[0].error.as_deref().unwrap_or("").contains("budget exceeded"));
    }
}
