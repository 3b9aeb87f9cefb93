use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use docbot_types::model::{AgentNode, AgentState, NodeId, NodeKind};
use docbot_types::trace::TraceEvent;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::bus::EventBus;

/// One entry in a run's persisted event log.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerEvent {
    pub seq: u64,
    pub node_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TrackerEventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerEventKind {
    Spawned {
        parent_id: Option<String>,
        node_kind: NodeKind,
        target: String,
        depth: u32,
    },
    StateChanged {
        state: AgentState,
    },
    TextAppended {
        chars: usize,
    },
    ToolCall {
        tool_name: String,
        duration_ms: u64,
        is_error: bool,
    },
    Finished {
        duration_ms: u64,
        state: AgentState,
    },
    NotepadCreated {
        topic: String,
    },
    NotepadWrite {
        topic: String,
        author: String,
    },
}

struct TrackerInner {
    run_id: Option<String>,
    nodes: HashMap<NodeId, AgentNode>,
    started_at: HashMap<NodeId, Instant>,
    events: Vec<TrackerEvent>,
    next_seq: u64,
}

/// Append-only record of every agent-tree lifecycle event for one run.
///
/// Mirrors the teacher's `RunStore`: an in-memory index guarded by a
/// single lock, plus a flat event log that gets exported to disk once
/// the run finishes. Unlike `RunStore` this tracker is not itself
/// bounded — a run's node count is governed by `max_depth`/
/// `agent_max_parallel`, so it cannot grow unboundedly within one run.
pub struct Tracker {
    inner: RwLock<TrackerInner>,
    bus: Mutex<Option<Arc<EventBus>>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TrackerInner {
                run_id: None,
                nodes: HashMap::new(),
                started_at: HashMap::new(),
                events: Vec::new(),
                next_seq: 0,
            }),
            bus: Mutex::new(None),
        }
    }

    /// Wire this tracker up to a run's event bus. Every subsequent
    /// lifecycle event is published there in addition to being appended
    /// to the exportable event log.
    pub fn attach_bus(&self, bus: Arc<EventBus>) {
        *self.bus.lock() = Some(bus);
    }

    fn publish(&self, event: TrackerEvent) {
        if let Some(bus) = self.bus.lock().as_ref() {
            bus.publish(event);
        }
    }

    pub fn set_run_id(&self, run_id: impl Into<String>) {
        self.inner.write().run_id = Some(run_id.into());
    }

    pub fn run_id(&self) -> Option<String> {
        self.inner.read().run_id.clone()
    }

    pub fn add_node(
        &self,
        id: NodeId,
        parent_id: Option<NodeId>,
        kind: NodeKind,
        target: String,
        depth: u32,
    ) {
        let node = AgentNode {
            id: id.clone(),
            parent_id: parent_id.clone(),
            kind,
            target: target.clone(),
            state: AgentState::Pending,
            depth,
            summary: None,
            children: Vec::new(),
        };

        let event = {
            let mut inner = self.inner.write();
            inner.started_at.insert(id.clone(), Instant::now());
            if let Some(parent) = &parent_id {
                if let Some(parent_node) = inner.nodes.get_mut(parent) {
                    parent_node.children.push(id.clone());
                }
            }
            inner.nodes.insert(id.clone(), node);
            push_event(
                &mut inner,
                id.clone(),
                TrackerEventKind::Spawned {
                    parent_id: parent_id.as_ref().map(|p| p.0.clone()),
                    node_kind: kind,
                    target,
                    depth,
                },
            )
        };
        self.publish(event);

        TraceEvent::AgentSpawned {
            node_id: id.0.clone(),
            kind: format!("{kind:?}"),
            depth,
            parent_id: parent_id.map(|p| p.0),
        }
        .emit();
    }

    pub fn set_state(&self, id: &NodeId, state: AgentState) {
        let (duration_ms, event) = {
            let mut inner = self.inner.write();
            if let Some(node) = inner.nodes.get_mut(id) {
                node.state = state;
            }
            let duration_ms = inner
                .started_at
                .get(id)
                .map(|start| start.elapsed().as_millis() as u64)
                .unwrap_or(0);

            let event = if matches!(state, AgentState::Done | AgentState::Error) {
                push_event(&mut inner, id.clone(), TrackerEventKind::Finished { duration_ms, state })
            } else {
                push_event(&mut inner, id.clone(), TrackerEventKind::StateChanged { state })
            };
            (duration_ms, event)
        };
        self.publish(event);

        if matches!(state, AgentState::Done | AgentState::Error) {
            TraceEvent::AgentFinished {
                node_id: id.0.clone(),
                state: format!("{state:?}"),
                duration_ms,
            }
            .emit();
        }
    }

    pub fn set_summary(&self, id: &NodeId, summary: String) {
        let mut inner = self.inner.write();
        if let Some(node) = inner.nodes.get_mut(id) {
            node.summary = Some(summary);
        }
    }

    pub fn append_text(&self, id: &NodeId, delta: &str) {
        let event = {
            let mut inner = self.inner.write();
            push_event(
                &mut inner,
                id.clone(),
                TrackerEventKind::TextAppended { chars: delta.chars().count() },
            )
        };
        self.publish(event);
    }

    pub fn record_tool_call(&self, id: &NodeId, tool_name: &str, duration_ms: u64, is_error: bool) {
        let event = {
            let mut inner = self.inner.write();
            push_event(
                &mut inner,
                id.clone(),
                TrackerEventKind::ToolCall {
                    tool_name: tool_name.to_string(),
                    duration_ms,
                    is_error,
                },
            )
        };
        self.publish(event);
        TraceEvent::ToolInvoked {
            node_id: id.0.clone(),
            tool_name: tool_name.to_string(),
            duration_ms,
            is_error,
        }
        .emit();
    }

    pub fn elapsed(&self, id: &NodeId) -> std::time::Duration {
        self.inner
            .read()
            .started_at
            .get(id)
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    pub fn node(&self, id: &NodeId) -> Option<AgentNode> {
        self.inner.read().nodes.get(id).cloned()
    }

    /// Full point-in-time view of every node, for late joiners and the
    /// `doctor` subcommand.
    pub fn snapshot(&self) -> Vec<AgentNode> {
        let inner = self.inner.read();
        let mut nodes: Vec<AgentNode> = inner.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    pub fn export_events(&self) -> Vec<TrackerEvent> {
        self.inner.read().events.clone()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

fn push_event(inner: &mut TrackerInner, node_id: NodeId, kind: TrackerEventKind) -> TrackerEvent {
    let seq = inner.next_seq;
    inner.next_seq += 1;
    let event = TrackerEvent {
        seq,
        node_id: node_id.0,
        timestamp: Utc::now(),
        kind,
    };
    inner.events.push(event.clone());
    event
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_node_lifecycle_and_emits_events() {
        let tracker = Tracker::new();
        let root = NodeId::root("auth");
        tracker.add_node(root.clone(), None, NodeKind::RootAgent, "auth".to_string(), 0);
        tracker.set_state(&root, AgentState::Running);
        tracker.record_tool_call(&root, "read_file", 12, false);
        tracker.set_state(&root, AgentState::Done);

        let node = tracker.node(&root).unwrap();
        assert_eq!(node.state, AgentState::Done);

        let events = tracker.export_events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0].kind, TrackerEventKind::Spawned { .. }));
        assert!(matches!(events.last().unwrap().kind, TrackerEventKind::Finished { .. }));
    }

    #[test]
    fn child_registers_under_parent() {
        let tracker = Tracker::new();
        let root = NodeId::root("auth");
        let child = root.child(0);
        tracker.add_node(root.clone(), None, NodeKind::RootAgent, "auth".to_string(), 0);
        tracker.add_node(child.clone(), Some(root.clone()), NodeKind::FileAgent, "auth.py".to_string(), 1);

        let parent_node = tracker.node(&root).unwrap();
        assert_eq!(parent_node.children, vec![child]);
    }

    #[test]
    fn snapshot_is_sorted_by_node_id() {
        let tracker = Tracker::new();
        let root = NodeId::root("auth");
        tracker.add_node(root.clone(), None, NodeKind::RootAgent, "auth".to_string(), 0);
        tracker.add_node(root.child(1), Some(root.clone()), NodeKind::FileAgent, "b.py".to_string(), 1);
        tracker.add_node(root.child(0), Some(root.clone()), NodeKind::FileAgent, "a.py".to_string(), 1);

        let snapshot = tracker.snapshot();
        let ids: Vec<String> = snapshot.iter().map(|n| n.id.0.clone()).collect();
        assert_eq!(ids, vec!["auth".to_string(), "auth.0".to_string(), "auth.1".to_string()]);
    }
}
