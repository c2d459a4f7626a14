//! The single-writer actor: every mutation to the run index is serialized
//! through this task's mailbox, guaranteeing read-modify-write atomicity
//! without a lock visible to callers.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};

use crate::bus::Bus;
use crate::error::{RunGraphError, RunGraphResult};
use crate::record::{NewRunAttrs, RunEvent, RunRecord, RunStatus, TimestampMs};
use crate::store::RunStore;

/// A transition update function: given the current record (already checked
/// for transition validity), mutate it in place.
pub type UpdateFn = Box<dyn FnOnce(&mut RunRecord) + Send>;

pub(crate) enum Command {
    NewRun {
        attrs: NewRunAttrs,
        now_ms: TimestampMs,
        reply: oneshot::Sender<RunGraphResult<String>>,
    },
    AddChild {
        parent_id: String,
        child_id: String,
        reply: oneshot::Sender<RunGraphResult<()>>,
    },
    AtomicTransition {
        id: String,
        target: RunStatus,
        now_ms: TimestampMs,
        update: UpdateFn,
        reply: oneshot::Sender<RunGraphResult<()>>,
    },
    Cleanup {
        ttl_seconds: i64,
        now_ms: TimestampMs,
        reply: oneshot::Sender<RunGraphResult<usize>>,
    },
}

pub(crate) struct Writer {
    index: Arc<DashMap<String, RunRecord>>,
    store: RunStore,
    bus: Arc<Bus>,
    rx: mpsc::Receiver<Command>,
}

impl Writer {
    pub(crate) fn new(
        index: Arc<DashMap<String, RunRecord>>,
        store: RunStore,
        bus: Arc<Bus>,
        rx: mpsc::Receiver<Command>,
    ) -> Self {
        Self { index, store, bus, rx }
    }

    /// Load from disk, rewriting any `running` record to `lost`, then serve
    /// the mailbox until senders drop.
    pub(crate) async fn run(mut self, loaded: HashMap<String, RunRecord>, now_ms: TimestampMs) {
        for (id, mut record) in loaded {
            if record.status == RunStatus::Running {
                tracing::warn!(run_id = %id, "run observed running at startup, marking lost");
                record.status = RunStatus::Lost;
                record.error = Some("lost_on_restart".to_string());
                record.completed_at = Some(now_ms);
                record.updated_at = now_ms;
                if let Err(e) = self.store.put(&record) {
                    tracing::warn!(run_id = %id, error = %e, "failed to persist lost-on-restart record");
                }
            }
            self.index.insert(id, record);
        }

        while let Some(cmd) = self.rx.recv().await {
            self.handle(cmd);
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::NewRun { attrs, now_ms, reply } => {
                let _ = reply.send(self.new_run(attrs, now_ms));
            },
            Command::AddChild { parent_id, child_id, reply } => {
                let _ = reply.send(self.add_child(&parent_id, &child_id));
            },
            Command::AtomicTransition {
                id,
                target,
                now_ms,
                update,
                reply,
            } => {
                let _ = reply.send(self.atomic_transition(&id, target, now_ms, update));
            },
            Command::Cleanup { ttl_seconds, now_ms, reply } => {
                let _ = reply.send(self.cleanup(ttl_seconds, now_ms));
            },
        }
    }

    fn new_run(&mut self, attrs: NewRunAttrs, now_ms: TimestampMs) -> RunGraphResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let record = RunRecord::new(id.clone(), attrs.parent.clone(), now_ms, attrs.meta);
        self.store.put(&record)?;
        self.index.insert(id.clone(), record);

        if let Some(parent_id) = &attrs.parent {
            self.add_child(parent_id, &id)?;
        }

        self.publish(&id, RunStatus::Queued, "created", now_ms);
        Ok(id)
    }

    fn add_child(&mut self, parent_id: &str, child_id: &str) -> RunGraphResult<()> {
        let mut entry = self
            .index
            .get_mut(parent_id)
            .ok_or_else(|| RunGraphError::NotFound(parent_id.to_string()))?;
        if !entry.children.iter().any(|c| c == child_id) {
            entry.children.push(child_id.to_string());
        }
        self.store.put(&entry)?;
        Ok(())
    }

    fn atomic_transition(
        &mut self,
        id: &str,
        target: RunStatus,
        now_ms: TimestampMs,
        update: UpdateFn,
    ) -> RunGraphResult<()> {
        let mut entry = self.index.get_mut(id).ok_or_else(|| RunGraphError::NotFound(id.to_string()))?;
        if !entry.status.can_transition_to(target) {
            return Err(RunGraphError::InvalidTransition {
                id: id.to_string(),
                from: entry.status,
                to: target,
            });
        }
        entry.status = target;
        entry.updated_at = now_ms;
        if target == RunStatus::Running {
            entry.started_at = Some(now_ms);
        }
        if target.is_terminal() {
            entry.completed_at = Some(now_ms);
        }
        update(&mut entry);
        self.store.put(&entry)?;

        let parent = entry.parent.clone();
        drop(entry);
        self.publish_with_parent(id, parent, target, "status_changed", now_ms);
        Ok(())
    }

    fn cleanup(&mut self, ttl_seconds: i64, now_ms: TimestampMs) -> RunGraphResult<usize> {
        let cutoff = now_ms - ttl_seconds * 1000;
        let expired: Vec<String> = self
            .index
            .iter()
            .filter(|e| e.status.is_terminal() && e.last_touched() < cutoff)
            .map(|e| e.id.clone())
            .collect();

        const CHUNK: usize = 64;
        let mut deleted = 0usize;
        for chunk in expired.chunks(CHUNK) {
            for id in chunk {
                self.index.remove(id);
                if let Err(e) = self.store.delete(id) {
                    tracing::warn!(run_id = %id, error = %e, "failed to delete expired run record");
                } else {
                    deleted += 1;
                }
            }
        }
        if deleted > 0 {
            self.store.sync()?;
        }
        Ok(deleted)
    }

    fn publish(&self, id: &str, status: RunStatus, event: &str, now_ms: TimestampMs) {
        let parent = self.index.get(id).and_then(|e| e.parent.clone());
        self.publish_with_parent(id, parent, status, event, now_ms);
    }

    fn publish_with_parent(
        &self,
        id: &str,
        parent: Option<String>,
        status: RunStatus,
        event: &str,
        now_ms: TimestampMs,
    ) {
        let session_key = self
            .index
            .get(id)
            .and_then(|e| e.meta.get("session_key").and_then(|v| v.as_str()).map(str::to_string));
        self.bus.publish_state_change(RunEvent {
            run_id: id.to_string(),
            parent_run_id: parent,
            session_key,
            status,
            event: event.to_string(),
            timestamp_ms: now_ms,
        });
    }
}
