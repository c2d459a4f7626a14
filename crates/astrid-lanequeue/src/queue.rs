//! The scheduler: FIFO per-lane queues with a concurrency cap, draining
//! onto supervised tasks (spec §4.3).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::config::LaneCaps;
use crate::error::LaneError;
use crate::lane::LaneKey;

type Starter = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct LaneState {
    running: usize,
    queue: VecDeque<Starter>,
}

struct Inner {
    caps: LaneCaps,
    lanes: Mutex<HashMap<LaneKey, LaneState>>,
}

/// A handle onto the lane queue scheduler. Cheaply cloneable.
#[derive(Clone)]
pub struct LaneQueue {
    inner: Arc<Inner>,
}

/// Per-job metadata: an optional deadline and a caller label used only for
/// tracing.
#[derive(Debug, Clone, Default)]
pub struct JobMeta {
    /// Optional hard deadline for the job's future.
    pub timeout: Option<Duration>,
    /// Free-form label surfaced in trace spans.
    pub label: Option<String>,
}

impl LaneQueue {
    /// Construct a scheduler with the given per-lane-class caps.
    #[must_use]
    pub fn new(caps: LaneCaps) -> Self {
        Self {
            inner: Arc::new(Inner {
                caps,
                lanes: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Run `job` on `lane`. Enqueues at the tail; the lane drains
    /// (running jobs up to its cap, FIFO) independently of this call, so
    /// this future resolves when the job itself completes, not when it is
    /// merely accepted.
    ///
    /// Returns the job's own `Ok`/`Err`, or [`LaneError::Crashed`]/
    /// [`LaneError::Timeout`] if the job panicked or exceeded `meta.timeout`.
    pub async fn run<F, Fut, T>(&self, lane: LaneKey, job: F, meta: JobMeta) -> Result<T, LaneError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<T, LaneError>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<T, LaneError>>();
        let cap = self.inner.caps.cap_for(lane.class());
        let inner = Arc::clone(&self.inner);
        let drain_lane = lane.clone();
        let label = meta.label.clone().unwrap_or_default();
        let timeout = meta.timeout;

        let starter: Starter = Box::new(move || {
            let inner2 = Arc::clone(&inner);
            let drain_lane2 = drain_lane.clone();
            tokio::spawn(async move {
                let fut = job();
                let outcome = match timeout {
                    Some(dur) => match tokio::time::timeout(dur, fut).await {
                        Ok(result) => result,
                        Err(_) => Err(LaneError::Timeout),
                    },
                    None => fut.await,
                };
                let _ = tx.send(outcome);
                finish_and_drain(&inner2, &drain_lane2, cap);
            });
        });

        enqueue(&self.inner, lane.clone(), starter, cap);
        trace!(lane = %lane, label, "lane job enqueued");
        rx.await.map_err(|_| LaneError::Crashed("task dropped before reply".to_string()))?
    }

    /// Number of jobs currently executing on `lane` (for observability and
    /// tests of the cap invariant).
    #[must_use]
    pub fn running(&self, lane: &LaneKey) -> usize {
        self.inner.lanes.lock().expect("lane mutex poisoned").get(lane).map_or(0, |s| s.running)
    }

    /// Number of jobs waiting (not yet started) on `lane`.
    #[must_use]
    pub fn queued(&self, lane: &LaneKey) -> usize {
        self.inner.lanes.lock().expect("lane mutex poisoned").get(lane).map_or(0, |s| s.queue.len())
    }
}

fn enqueue(inner: &Arc<Inner>, lane: LaneKey, starter: Starter, cap: usize) {
    let mut lanes = inner.lanes.lock().expect("lane mutex poisoned");
    let state = lanes.entry(lane.clone()).or_default();
    state.queue.push_back(starter);
    drain_locked(state, cap, &lane);
}

fn finish_and_drain(inner: &Arc<Inner>, lane: &LaneKey, cap: usize) {
    let mut lanes = inner.lanes.lock().expect("lane mutex poisoned");
    if let Some(state) = lanes.get_mut(lane) {
        state.running = state.running.saturating_sub(1);
        drain_locked(state, cap, lane);
    }
}

fn drain_locked(state: &mut LaneState, cap: usize, lane: &LaneKey) {
    while state.running < cap {
        let Some(starter) = state.queue.pop_front() else { break };
        state.running += 1;
        debug!(lane = %lane, running = state.running, cap, "lane job starting");
        starter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn respects_cap_and_completes_all() {
        let caps = LaneCaps::new().with_cap("bg", 2);
        let q = LaneQueue::new(caps);
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..10 {
            let q = q.clone();
            let concurrent = Arc::clone(&concurrent);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                q.run(
                    LaneKey::atom("bg"),
                    move || async move {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                        Ok::<usize, LaneError>(i)
                    },
                    JobMeta::default(),
                )
                .await
            }));
        }
        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap().unwrap());
        }
        results.sort_unstable();
        assert_eq!(results, (0..10).collect::<Vec<_>>());
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn timeout_surfaces_as_error() {
        let q = LaneQueue::new(LaneCaps::new());
        let meta = JobMeta {
            timeout: Some(Duration::from_millis(5)),
            label: None,
        };
        let result = q
            .run(
                LaneKey::atom("slow"),
                || async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<(), LaneError>(())
                },
                meta,
            )
            .await;
        assert_eq!(result, Err(LaneError::Timeout));
    }

    #[tokio::test]
    async fn tuple_lanes_share_class_cap_independent_queues() {
        let caps = LaneCaps::new().with_cap("session", 1);
        let q = LaneQueue::new(caps);
        let a = LaneKey::tuple("session", "a");
        let b = LaneKey::tuple("session", "b");
        assert_eq!(a.class(), "session");
        assert_eq!(b.class(), "session");
        let ra = q.run(a, || async { Ok::<_, LaneError>(1) }, JobMeta::default()).await;
        let rb = q.run(b, || async { Ok::<_, LaneError>(2) }, JobMeta::default()).await;
        assert_eq!(ra, Ok(1));
        assert_eq!(rb, Ok(2));
    }
}
