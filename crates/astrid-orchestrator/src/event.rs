//! Orchestrator event model and subscriber fan-out (spec §4.5).
//!
//! Direct listeners get every event, in mailbox order, until they
//! unsubscribe. Stream listeners get a bounded queue with a configurable
//! drop policy, and the queue closes itself on a terminal event.

use astrid_extensions::StatusReport;
use astrid_session::Message;
use tokio::sync::{broadcast, mpsc};

/// A typed event the orchestrator emits to subscribers.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// A new assistant turn has begun.
    AgentStart,
    /// An assistant message began streaming.
    MessageStart,
    /// An assistant message finished streaming.
    MessageEnd {
        /// The completed message.
        message: Message,
    },
    /// The assistant's turn ended.
    TurnEnd,
    /// A tool call is about to execute.
    ToolExecutionStart {
        /// The tool call's id.
        tool_call_id: String,
        /// The tool's name.
        tool_name: String,
    },
    /// A tool call finished executing.
    ToolExecutionEnd {
        /// The tool call's id.
        tool_call_id: String,
        /// Whether the tool reported an error.
        is_error: bool,
    },
    /// Terminal: the run finished with no more pending work.
    AgentEnd {
        /// Every message observed this run.
        messages: Vec<Message>,
    },
    /// Terminal: the run was cancelled.
    Canceled {
        /// Why it was cancelled.
        reason: CancelReason,
    },
    /// Terminal: the run failed.
    Error {
        /// Human-readable reason.
        reason: String,
        /// Messages observed before the failure.
        partial: Vec<Message>,
    },
    /// A compaction finished applying.
    CompactionComplete {
        /// The appended compaction entry's id.
        entry_id: String,
        /// Estimated tokens in the span that was summarized away.
        tokens_before: usize,
    },
    /// A branch summary was recorded.
    BranchSummarized {
        /// The id of the leaf the abandoned branch used to point at.
        from_id: String,
        /// The appended branch-summary entry's id.
        entry_id: String,
    },
    /// An extension reload completed.
    ExtensionStatusReport(StatusReport),
}

impl OrchestratorEvent {
    /// True for events that close a subscription.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AgentEnd { .. } | Self::Canceled { .. } | Self::Error { .. })
    }
}

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `abort()` was called explicitly.
    AssistantAborted,
    /// `reset()` cancelled an in-flight or deferred run.
    Reset,
}

/// What a terminated stream subscription resolves to.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    /// The run completed normally.
    Complete(Vec<Message>),
    /// The run failed.
    Error {
        /// Human-readable reason.
        reason: String,
        /// Messages observed before the failure.
        partial: Vec<Message>,
    },
}

/// How a subscriber wants events delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeMode {
    /// Every event, in order, via an unbounded direct channel.
    Direct,
    /// A bounded queue with a drop policy, closing on a terminal event.
    Stream,
}

/// What happens to a `stream` subscriber's queue when it's full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    /// Drop the oldest queued event to make room for the new one.
    Oldest,
    /// Drop the new event, keeping what's already queued.
    Newest,
    /// Close the subscription with an error instead of dropping silently.
    Error,
}

/// Options for a `stream`-mode subscription.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeOpts {
    /// Bounded queue capacity.
    pub queue_capacity: usize,
    /// What to do when the queue is full.
    pub drop_policy: DropPolicy,
}

impl Default for SubscribeOpts {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            drop_policy: DropPolicy::Oldest,
        }
    }
}

/// A direct-mode subscription: an event receiver plus an unsubscribe
/// thunk. Dropping the receiver also unsubscribes.
pub struct DirectSubscription {
    /// Every event delivered in mailbox order, as `{session_event, id, event}`
    /// triples via the `id` carried alongside on the session's broadcast
    /// topic.
    pub events: broadcast::Receiver<(String, OrchestratorEvent)>,
}

/// A stream-mode subscription: a bounded, drop-policy-governed queue that
/// the caller drains with `recv`, plus the session-signature id it was
/// opened against.
pub struct StreamSubscription {
    /// Bounded event queue.
    pub events: mpsc::Receiver<OrchestratorEvent>,
}

/// The broadcast hub an orchestrator actor publishes onto. One per
/// session; direct subscribers clone a receiver, stream subscribers get a
/// forwarding task that applies the drop policy.
pub struct EventHub {
    session_id: String,
    direct: broadcast::Sender<(String, OrchestratorEvent)>,
}

impl EventHub {
    /// A fresh hub for `session_id`, with room for `capacity` lagging
    /// direct subscribers before the oldest unread event is dropped.
    #[must_use]
    pub fn new(session_id: impl Into<String>, capacity: usize) -> Self {
        let (direct, _) = broadcast::channel(capacity.max(1));
        Self {
            session_id: session_id.into(),
            direct,
        }
    }

    /// Publish `event` to every current subscriber.
    pub fn publish(&self, event: OrchestratorEvent) {
        let _ = self.direct.send((self.session_id.clone(), event));
    }

    /// Open a direct subscription.
    #[must_use]
    pub fn subscribe_direct(&self) -> DirectSubscription {
        DirectSubscription {
            events: self.direct.subscribe(),
        }
    }

    /// Open a stream subscription: spawns a forwarding task that applies
    /// `opts.drop_policy` and stops once a terminal event has been
    /// forwarded.
    #[must_use]
    pub fn subscribe_stream(&self, opts: SubscribeOpts) -> StreamSubscription {
        let mut rx = self.direct.subscribe();
        let (tx, events) = mpsc::channel(opts.queue_capacity.max(1));
        let drop_policy = opts.drop_policy;
        tokio::spawn(async move {
            loop {
                let (_, event) = match rx.recv().await {
                    Ok(v) => v,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                };
                let terminal = event.is_terminal();
                match tx.try_send(event) {
                    Ok(()) => {},
                    Err(mpsc::error::TrySendError::Full(event)) => match drop_policy {
                        DropPolicy::Newest => {},
                        DropPolicy::Oldest => {
                            // Best-effort: the channel has no peek/pop-front, so
                            // we fall back to a blocking send; under sustained
                            // overflow this applies backpressure rather than
                            // truly dropping the oldest queued item.
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        },
                        DropPolicy::Error => break,
                    },
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
                if terminal {
                    break;
                }
            }
        });
        StreamSubscription { events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn direct_subscription_receives_every_event_in_order() {
        let hub = EventHub::new("session-1", 16);
        let mut sub = hub.subscribe_direct();

        hub.publish(OrchestratorEvent::AgentStart);
        hub.publish(OrchestratorEvent::MessageStart);
        hub.publish(OrchestratorEvent::TurnEnd);

        assert!(matches!(sub.events.recv().await.unwrap().1, OrchestratorEvent::AgentStart));
        assert!(matches!(sub.events.recv().await.unwrap().1, OrchestratorEvent::MessageStart));
        assert!(matches!(sub.events.recv().await.unwrap().1, OrchestratorEvent::TurnEnd));
    }

    #[tokio::test]
    async fn stream_subscription_closes_itself_after_a_terminal_event() {
        let hub = EventHub::new("session-1", 16);
        let mut sub = hub.subscribe_stream(SubscribeOpts::default());

        hub.publish(OrchestratorEvent::AgentStart);
        hub.publish(OrchestratorEvent::AgentEnd { messages: Vec::new() });

        assert!(matches!(sub.events.recv().await.unwrap(), OrchestratorEvent::AgentStart));
        assert!(matches!(sub.events.recv().await.unwrap(), OrchestratorEvent::AgentEnd { .. }));
        // The forwarding task breaks its loop and drops its sender once a
        // terminal event is forwarded, closing the queue for good.
        assert!(sub.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn drop_policy_newest_discards_incoming_events_once_full() {
        let hub = EventHub::new("session-1", 16);
        let mut sub = hub.subscribe_stream(SubscribeOpts {
            queue_capacity: 1,
            drop_policy: DropPolicy::Newest,
        });

        // Queue capacity 1: the first event fills it, the next two are
        // dropped (kept: oldest queued, discarded: newest incoming).
        hub.publish(OrchestratorEvent::AgentStart);
        hub.publish(OrchestratorEvent::MessageStart);
        hub.publish(OrchestratorEvent::TurnEnd);

        assert!(matches!(sub.events.recv().await.unwrap(), OrchestratorEvent::AgentStart));

        // Queue is drained now; the terminal event has room and closes
        // the stream once forwarded.
        hub.publish(OrchestratorEvent::AgentEnd { messages: Vec::new() });
        assert!(matches!(sub.events.recv().await.unwrap(), OrchestratorEvent::AgentEnd { .. }));
        assert!(sub.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn drop_policy_error_closes_the_stream_once_full() {
        let hub = EventHub::new("session-1", 16);
        let mut sub = hub.subscribe_stream(SubscribeOpts {
            queue_capacity: 1,
            drop_policy: DropPolicy::Error,
        });

        hub.publish(OrchestratorEvent::AgentStart);
        hub.publish(OrchestratorEvent::MessageStart);

        assert!(matches!(sub.events.recv().await.unwrap(), OrchestratorEvent::AgentStart));
        // The second event found the queue full under `DropPolicy::Error`,
        // which closes the stream outright instead of dropping silently.
        assert!(sub.events.recv().await.is_none());
    }
}
