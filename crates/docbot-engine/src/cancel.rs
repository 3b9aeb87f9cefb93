use std::collections::{HashMap, HashSet};

use docbot_types::cancel::CancelToken;
use docbot_types::model::NodeId;
use parking_lot::Mutex;

/// Tracks active cancellation tokens per agent node, with group support
/// for cascading parent -> child cancellation down the delegation tree.
///
/// A `tokio_util::sync::CancellationToken` would additionally let a
/// waiting future be woken rather than polled; the engine pairs this map
/// with one of those per run for in-flight LLM calls (see
/// `engine::run_agent`), while this map is the bookkeeping layer that
/// knows which node belongs to which parent.
pub struct CancelMap {
    tokens: Mutex<HashMap<NodeId, CancelToken>>,
    groups: Mutex<HashMap<NodeId, HashSet<NodeId>>>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            groups: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, node_id: NodeId) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(node_id, token.clone());
        token
    }

    pub fn cancel(&self, node_id: &NodeId) -> bool {
        let found = if let Some(token) = self.tokens.lock().get(node_id) {
            token.cancel();
            true
        } else {
            false
        };

        if let Some(children) = self.groups.lock().get(node_id) {
            let tokens = self.tokens.lock();
            for child_id in children {
                if let Some(child_token) = tokens.get(child_id) {
                    child_token.cancel();
                }
            }
        }

        found
    }

    pub fn remove(&self, node_id: &NodeId) {
        self.tokens.lock().remove(node_id);
        self.groups.lock().remove(node_id);
    }

    pub fn is_running(&self, node_id: &NodeId) -> bool {
        self.tokens.lock().contains_key(node_id)
    }

    pub fn add_to_group(&self, parent_id: &NodeId, child_id: NodeId) {
        self.groups
            .lock()
            .entry(parent_id.clone())
            .or_default()
            .insert(child_id);
    }
}

impl Default for CancelMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_cascades_to_children() {
        let map = CancelMap::new();
        let parent = NodeId::root("auth");
        let child1 = parent.child(0);
        let child2 = parent.child(1);

        let parent_token = map.register(parent.clone());
        let child1_token = map.register(child1.clone());
        let child2_token = map.register(child2.clone());
        map.add_to_group(&parent, child1.clone());
        map.add_to_group(&parent, child2.clone());

        map.cancel(&parent);
        assert!(parent_token.is_cancelled());
        assert!(child1_token.is_cancelled());
        assert!(child2_token.is_cancelled());
    }

    #[test]
    fn cancel_unregistered_node_returns_false() {
        let map = CancelMap::new();
        assert!(!map.cancel(&NodeId::root("ghost")));
    }

    #[test]
    fn remove_clears_token_and_group() {
        let map = CancelMap::new();
        let parent = NodeId::root("auth");
        map.register(parent.clone());
        assert!(map.is_running(&parent));
        map.remove(&parent);
        assert!(!map.is_running(&parent));
    }
}
