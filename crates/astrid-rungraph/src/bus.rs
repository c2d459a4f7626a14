//! Per-run and per-parent-run pub/sub topics.
//!
//! Topics are created lazily and pruned once their last subscriber drops
//! (the send side is kept alive by the bus itself so publishing never races
//! a topic's creation).

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::record::RunEvent;

const TOPIC_CAPACITY: usize = 256;

/// A registry of broadcast topics keyed by `run_graph:<run_id>` /
/// `run:<run_id>` names.
#[derive(Debug, Default)]
pub struct Bus {
    topics: DashMap<String, broadcast::Sender<RunEvent>>,
}

impl Bus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic, creating it if it doesn't exist yet.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<RunEvent> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to a topic. A no-op if nobody has ever subscribed.
    pub fn publish(&self, topic: &str, event: RunEvent) {
        if let Some(tx) = self.topics.get(topic) {
            // No subscribers is not an error: the topic exists but is idle.
            let _ = tx.send(event);
        }
    }

    /// Topic name for a run's own events.
    #[must_use]
    pub fn run_topic(run_id: &str) -> String {
        format!("run:{run_id}")
    }

    /// Topic name for a run graph's aggregate events.
    #[must_use]
    pub fn run_graph_topic(run_id: &str) -> String {
        format!("run_graph:{run_id}")
    }

    /// Publish a state-change event on both the run's own topic and, if it
    /// has a parent, the parent's topic too.
    pub fn publish_state_change(&self, event: RunEvent) {
        self.publish(&Self::run_graph_topic(&event.run_id), event.clone());
        self.publish(&Self::run_topic(&event.run_id), event.clone());
        if let Some(parent) = &event.parent_run_id {
            self.publish(&Self::run_topic(parent), event);
        }
    }
}
