use std::collections::HashMap;

use docbot_types::model::NodeId;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::tracker::TrackerEvent;

const DEFAULT_CAPACITY: usize = 1024;

/// Run-scoped broadcast of tracker events to live subscribers (the CLI's
/// progress renderer, a future TUI, `doctor`).
///
/// A bounded `mpsc` channel backs delivery; producers never block
/// (spec's §4.3 contract), so a full channel means the newest event is
/// dropped and logged at debug rather than applying backpressure to the
/// pipeline. A last-known-snapshot map lets a late subscriber catch up
/// on each node's most recent event without replaying the whole log.
pub struct EventBus {
    tx: mpsc::Sender<TrackerEvent>,
    rx: parking_lot::Mutex<Option<mpsc::Receiver<TrackerEvent>>>,
    last_known: RwLock<HashMap<NodeId, TrackerEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: parking_lot::Mutex::new(Some(rx)),
            last_known: RwLock::new(HashMap::new()),
        }
    }

    /// Publish an event. Never blocks: a full channel drops the event
    /// after logging at debug, per the overflow policy decided in
    /// `DESIGN.md`.
    pub fn publish(&self, event: TrackerEvent) {
        let node_id = NodeId(event.node_id.clone());
        self.last_known.write().insert(node_id, event.clone());

        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(event) {
            tracing::debug!("event bus full, dropping newest event");
        }
    }

    /// Take the receiver for consumption. Only one consumer is supported
    /// per run; subsequent calls return `None`.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<TrackerEvent>> {
        self.rx.lock().take()
    }

    pub fn last_known(&self, node_id: &NodeId) -> Option<TrackerEvent> {
        self.last_known.read().get(node_id).cloned()
    }

    pub fn snapshot(&self) -> Vec<TrackerEvent> {
        let mut events: Vec<TrackerEvent> = self.last_known.read().values().cloned().collect();
        events.sort_by_key(|e| e.seq);
        events
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::TrackerEventKind;
    use chrono::Utc;
    use docbot_types::model::AgentState;

    fn event(seq: u64, node_id: &str) -> TrackerEvent {
        TrackerEvent {
            seq,
            node_id: node_id.to_string(),
            timestamp: Utc::now(),
            kind: TrackerEventKind::StateChanged { state: AgentState::Running },
        }
    }

    #[test]
    fn publish_is_received_and_snapshotted() {
        let bus = EventBus::new();
        let mut rx = bus.take_receiver().unwrap();
        bus.publish(event(0, "auth"));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.node_id, "auth");
        assert!(bus.last_known(&NodeId::root("auth")).is_some());
    }

    #[test]
    fn overflow_drops_newest_without_blocking() {
        let bus = EventBus::with_capacity(1);
        let _rx = bus.take_receiver().unwrap();
        bus.publish(event(0, "auth"));
        bus.publish(event(1, "auth"));
        bus.publish(event(2, "auth"));

        // Snapshot always reflects the latest publish regardless of
        // whether the channel itself dropped it.
        let latest = bus.last_known(&NodeId::root("auth")).unwrap();
        assert_eq!(latest.seq, 2);
    }

    #[test]
    fn second_receiver_request_returns_none() {
        let bus = EventBus::new();
        assert!(bus.take_receiver().is_some());
        assert!(bus.take_receiver().is_none());
    }
}
