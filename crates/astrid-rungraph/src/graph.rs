//! Public handle onto the process-wide run graph.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, watch};

use crate::bus::Bus;
use crate::error::{RunGraphError, RunGraphResult};
use crate::record::{NewRunAttrs, RunRecord, RunStatus, TimestampMs};
use crate::store::RunStore;
use crate::writer::{Command, UpdateFn, Writer};

const COMMAND_CHANNEL_CAPACITY: usize = 1024;
const FALLBACK_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Mode for [`RunGraph::await_runs`]: wait for all of the given runs to
/// reach a terminal state, or for any one of them to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Every id must be in a terminal status.
    All,
    /// At least one id must be in a terminal status.
    Any,
}

/// Outcome of [`RunGraph::await_runs`].
#[derive(Debug, Clone)]
pub struct AwaitOutcome {
    /// Current records for the ids that were awaited, in request order.
    pub snapshot: Vec<Option<RunRecord>>,
}

/// Handle onto the shared, process-wide run graph. Cheaply cloneable; reads
/// go straight to a lock-free index, writes are serialized through a
/// dedicated writer task.
#[derive(Clone)]
pub struct RunGraph {
    index: Arc<DashMap<String, RunRecord>>,
    bus: Arc<Bus>,
    cmd_tx: mpsc::Sender<Command>,
    loaded_rx: watch::Receiver<bool>,
}

impl RunGraph {
    /// Open the run graph backed by a disk store at `store_root`. Disk load
    /// happens asynchronously in the background; use [`Self::ensure_loaded`]
    /// to block until it's visible to readers.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::Store`] if `store_root` cannot be created.
    pub fn open(store_root: impl Into<PathBuf>) -> RunGraphResult<Self> {
        let store = RunStore::open(store_root)?;
        let index = Arc::new(DashMap::new());
        let bus = Arc::new(Bus::new());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (loaded_tx, loaded_rx) = watch::channel(false);

        let writer_index = index.clone();
        let writer_bus = bus.clone();
        let writer_store = store.clone();
        tokio::spawn(async move {
            let now_ms = now_ms();
            let loaded = match tokio::task::spawn_blocking({
                let store = writer_store.clone();
                move || store.load_all()
            })
            .await
            {
                Ok(Ok(loaded)) => loaded,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "failed to load run graph from disk");
                    Default::default()
                },
                Err(e) => {
                    tracing::error!(error = %e, "run graph load task panicked");
                    Default::default()
                },
            };
            let writer = Writer::new(writer_index, writer_store, writer_bus, cmd_rx);
            // Mark loaded before serving the mailbox so ensure_loaded callers
            // never race a command that was queued during load.
            let _ = loaded_tx.send(true);
            writer.run(loaded, now_ms).await;
        });

        Ok(Self {
            index,
            bus,
            cmd_tx,
            loaded_rx,
        })
    }

    /// Block until the background disk load has completed.
    pub async fn ensure_loaded(&mut self) {
        let _ = self.loaded_rx.wait_for(|&loaded| loaded).await;
    }

    /// Spawn a periodic cleanup timer. Returns a join handle the caller may
    /// drop to detach, or abort to stop.
    #[must_use]
    pub fn spawn_cleanup_timer(&self, ttl_seconds: i64, interval: Duration) -> tokio::task::JoinHandle<()> {
        let graph = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = graph.cleanup(ttl_seconds).await {
                    tracing::warn!(error = %e, "run graph cleanup tick failed");
                }
            }
        })
    }

    /// Create a new queued run.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::WriterGone`] if the writer task has exited.
    pub async fn new_run(&self, attrs: NewRunAttrs) -> RunGraphResult<String> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::NewRun {
            attrs,
            now_ms: now_ms(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RunGraphError::WriterGone)?
    }

    /// Link `child_id` as a child of `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::NotFound`] if `parent_id` is unknown.
    pub async fn add_child(&self, parent_id: &str, child_id: &str) -> RunGraphResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::AddChild {
            parent_id: parent_id.to_string(),
            child_id: child_id.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RunGraphError::WriterGone)?
    }

    /// Transition `id` to `Running`.
    ///
    /// # Errors
    ///
    /// See [`Self::atomic_transition`].
    pub async fn mark_running(&self, id: &str) -> RunGraphResult<()> {
        self.atomic_transition(id, RunStatus::Running, |_| {}).await
    }

    /// Transition `id` to `Completed`, storing `result`.
    ///
    /// # Errors
    ///
    /// See [`Self::atomic_transition`].
    pub async fn finish(&self, id: &str, result: serde_json::Value) -> RunGraphResult<()> {
        self.atomic_transition(id, RunStatus::Completed, move |r| {
            r.result = Some(result);
        })
        .await
    }

    /// Transition `id` to `Error`, storing `error`.
    ///
    /// # Errors
    ///
    /// See [`Self::atomic_transition`].
    pub async fn fail(&self, id: &str, error: impl Into<String>) -> RunGraphResult<()> {
        let error = error.into();
        self.atomic_transition(id, RunStatus::Error, move |r| {
            r.error = Some(error);
        })
        .await
    }

    /// Apply an arbitrary transition, validated against the state machine
    /// and applied with `update` while the writer holds the record.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::NotFound`] if `id` is unknown, or
    /// [`RunGraphError::InvalidTransition`] if the move is not permitted
    /// from the record's current status; on either error the record is left
    /// unmutated.
    pub async fn atomic_transition(
        &self,
        id: &str,
        target: RunStatus,
        update: impl FnOnce(&mut RunRecord) + Send + 'static,
    ) -> RunGraphResult<()> {
        let update: UpdateFn = Box::new(update);
        let (reply, rx) = oneshot::channel();
        self.send(Command::AtomicTransition {
            id: id.to_string(),
            target,
            now_ms: now_ms(),
            update,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RunGraphError::WriterGone)?
    }

    /// Direct, lock-free index read.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<RunRecord> {
        self.index.get(id).map(|r| r.clone())
    }

    /// Wait for `ids` to satisfy `mode`, subscribing to each run's bus topic
    /// rather than busy-waiting; falls back to a bounded poll to guard
    /// against a missed notification racing subscription.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::Timeout`] if `timeout_ms` elapses first.
    pub async fn await_runs(&self, ids: &[String], mode: WaitMode, timeout_ms: u64) -> RunGraphResult<AwaitOutcome> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        let mut receivers: Vec<_> = ids.iter().map(|id| self.bus.subscribe(&Bus::run_topic(id))).collect();

        loop {
            if self.wait_condition_met(ids, mode) {
                return Ok(AwaitOutcome {
                    snapshot: ids.iter().map(|id| self.get(id)).collect(),
                });
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RunGraphError::Timeout(ids.to_vec()));
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let poll_wait = remaining.min(FALLBACK_POLL_INTERVAL);

            let wait_any = async {
                let mut futs: Vec<_> = receivers.iter_mut().map(|rx| Box::pin(rx.recv())).collect();
                let (_res, _idx, _rest) = futures_select_any(&mut futs).await;
            };

            let _ = tokio::time::timeout(poll_wait, wait_any).await;
        }
    }

    fn wait_condition_met(&self, ids: &[String], mode: WaitMode) -> bool {
        let terminal = |id: &str| self.get(id).is_some_and(|r| r.status.is_terminal());
        match mode {
            WaitMode::All => ids.iter().all(|id| terminal(id)),
            WaitMode::Any => ids.iter().any(|id| terminal(id)),
        }
    }

    /// Run TTL cleanup immediately, returning the number of records purged.
    ///
    /// # Errors
    ///
    /// Returns [`RunGraphError::WriterGone`] if the writer task has exited.
    pub async fn cleanup(&self, ttl_seconds: i64) -> RunGraphResult<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Cleanup {
            ttl_seconds,
            now_ms: now_ms(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RunGraphError::WriterGone)?
    }

    async fn send(&self, cmd: Command) -> RunGraphResult<()> {
        self.cmd_tx.send(cmd).await.map_err(|_| RunGraphError::WriterGone)
    }
}

/// Poll a set of boxed futures and return once any one resolves, alongside
/// its index; the others are dropped. A tiny hand-rolled `select_all` to
/// avoid pulling in `futures` for a single call site.
async fn futures_select_any<F, T>(futs: &mut [std::pin::Pin<Box<F>>]) -> (T, usize, ())
where
    F: std::future::Future<Output = T> + ?Sized,
{
    std::future::poll_fn(|cx| {
        for (i, fut) in futs.iter_mut().enumerate() {
            if let std::task::Poll::Ready(v) = fut.as_mut().poll(cx) {
                return std::task::Poll::Ready((v, i, ()));
            }
        }
        std::task::Poll::Pending
    })
    .await
}

fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lifecycle_transitions_are_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RunGraph::open(dir.path()).unwrap();
        graph.ensure_loaded().await;

        let id = graph.new_run(NewRunAttrs::default()).await.unwrap();
        assert_eq!(graph.get(&id).unwrap().status, RunStatus::Queued);

        graph.mark_running(&id).await.unwrap();
        assert_eq!(graph.get(&id).unwrap().status, RunStatus::Running);

        graph.finish(&id, serde_json::json!({"ok": true})).await.unwrap();
        let record = graph.get(&id).unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert!(record.completed_at.is_some());

        // Terminal states are sinks: a second transition is rejected and
        // leaves the record unmutated (Testable Property 4).
        let err = graph.fail(&id, "too late").await.unwrap_err();
        assert!(matches!(err, RunGraphError::InvalidTransition { .. }));
        assert_eq!(graph.get(&id).unwrap().status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn parent_child_links_are_bidirectional() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RunGraph::open(dir.path()).unwrap();
        graph.ensure_loaded().await;

        let parent = graph.new_run(NewRunAttrs::default()).await.unwrap();
        let child = graph
            .new_run(NewRunAttrs {
                parent: Some(parent.clone()),
                meta: serde_json::json!({}),
            })
            .await
            .unwrap();

        let parent_record = graph.get(&parent).unwrap();
        assert_eq!(parent_record.children, vec![child.clone()]);
        assert_eq!(graph.get(&child).unwrap().parent, Some(parent));
    }

    #[tokio::test]
    async fn await_runs_all_waits_for_every_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RunGraph::open(dir.path()).unwrap();
        graph.ensure_loaded().await;

        let a = graph.new_run(NewRunAttrs::default()).await.unwrap();
        let b = graph.new_run(NewRunAttrs::default()).await.unwrap();
        graph.mark_running(&a).await.unwrap();
        graph.mark_running(&b).await.unwrap();

        let driver = graph.clone();
        let (a2, b2) = (a.clone(), b.clone());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            driver.finish(&a2, serde_json::json!(null)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            driver.finish(&b2, serde_json::json!(null)).await.unwrap();
        });

        let outcome = graph.await_runs(&[a, b], WaitMode::All, 2_000).await.unwrap();
        assert_eq!(outcome.snapshot.len(), 2);
        assert!(outcome.snapshot.iter().all(|r| r.as_ref().unwrap().status.is_terminal()));
    }

    #[tokio::test]
    async fn await_runs_any_returns_as_soon_as_one_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RunGraph::open(dir.path()).unwrap();
        graph.ensure_loaded().await;

        let a = graph.new_run(NewRunAttrs::default()).await.unwrap();
        let b = graph.new_run(NewRunAttrs::default()).await.unwrap();
        graph.mark_running(&a).await.unwrap();
        graph.mark_running(&b).await.unwrap();

        let driver = graph.clone();
        let a2 = a.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            driver.finish(&a2, serde_json::json!(null)).await.unwrap();
        });

        let outcome = graph.await_runs(&[a, b], WaitMode::Any, 2_000).await.unwrap();
        assert!(outcome.snapshot[0].as_ref().unwrap().status.is_terminal());
        assert_eq!(outcome.snapshot[1].as_ref().unwrap().status, RunStatus::Running);
    }

    #[tokio::test]
    async fn await_runs_times_out_when_nothing_reaches_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RunGraph::open(dir.path()).unwrap();
        graph.ensure_loaded().await;

        let a = graph.new_run(NewRunAttrs::default()).await.unwrap();
        let err = graph.await_runs(&[a], WaitMode::All, 20).await.unwrap_err();
        assert!(matches!(err, RunGraphError::Timeout(_)));
    }

    #[tokio::test]
    async fn cleanup_purges_only_expired_terminal_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = RunGraph::open(dir.path()).unwrap();
        graph.ensure_loaded().await;

        let old = graph.new_run(NewRunAttrs::default()).await.unwrap();
        graph.mark_running(&old).await.unwrap();
        graph.finish(&old, serde_json::json!(null)).await.unwrap();

        let fresh = graph.new_run(NewRunAttrs::default()).await.unwrap();

        // ttl_seconds=0 means anything already terminal is immediately
        // eligible; `fresh` stays since it never reached a terminal status.
        let purged = graph.cleanup(0).await.unwrap();
        assert_eq!(purged, 1);
        assert!(graph.get(&old).is_none());
        assert!(graph.get(&fresh).is_some());
    }

    #[tokio::test]
    async fn running_record_is_rewritten_to_lost_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store_root = dir.path().to_path_buf();

        let id = {
            let mut graph = RunGraph::open(store_root.clone()).unwrap();
            graph.ensure_loaded().await;
            let id = graph.new_run(NewRunAttrs::default()).await.unwrap();
            graph.mark_running(&id).await.unwrap();
            id
            // `graph` (and its only `cmd_tx` sender) drops here, so the
            // writer task's mailbox closes and it exits.
        };

        // Give the dropped writer's task a moment to actually exit before
        // reopening the same store root.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut reopened = RunGraph::open(store_root.clone()).unwrap();
        reopened.ensure_loaded().await;
        let record = reopened.get(&id).unwrap();
        assert_eq!(record.status, RunStatus::Lost);
        assert_eq!(record.error.as_deref(), Some("lost_on_restart"));
    }
}
