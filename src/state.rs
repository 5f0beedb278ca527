use markup5ever_rcdom::Handle;
use std::collections::HashMap;

use crate::dom::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Unvisited,
    Resolved,
}

struct Entry {
    /// Keeps the node alive so its address is never reused within the pass.
    _handle: Handle,
    state: NodeState,
    raw: bool,
}

/// Per-render side table of node facts, keyed by node identity.
#[derive(Default)]
pub struct NodeStates {
    entries: HashMap<NodeId, Entry>,
}

impl NodeStates {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, handle: &Handle) -> &mut Entry {
        self.entries.entry(NodeId::of(handle)).or_insert_with(|| Entry {
            _handle: handle.clone(),
            state: NodeState::Unvisited,
            raw: false,
        })
    }

    pub fn state(&self, handle: &Handle) -> NodeState {
        self.entries
            .get(&NodeId::of(handle))
            .map_or(NodeState::Unvisited, |e| e.state)
    }

    pub fn is_resolved(&self, handle: &Handle) -> bool {
        self.state(handle) == NodeState::Resolved
    }

    pub fn mark_resolved(&mut self, handle: &Handle) {
        self.entry(handle).state = NodeState::Resolved;
    }

    pub fn clear_resolved(&mut self, handle: &Handle) {
        self.entry(handle).state = NodeState::Unvisited;
    }

    /// Text node written without escaping.
    pub fn mark_raw(&mut self, handle: &Handle) {
        self.entry(handle).raw = true;
    }

    pub fn is_raw(&self, handle: &Handle) -> bool {
        self.entries
            .get(&NodeId::of(handle))
            .map_or(false, |e| e.raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{deep_clone, new_element};

    #[test]
    fn test_states_follow_identity() {
        let mut states = NodeStates::new();
        let el = new_element("div", &[]);
        assert_eq!(states.state(&el), NodeState::Unvisited);

        states.mark_resolved(&el);
        assert!(states.is_resolved(&el));

        let copy = deep_clone(&el);
        assert!(!states.is_resolved(&copy));

        states.clear_resolved(&el);
        assert!(!states.is_resolved(&el));
        assert_eq!(states.len(), 1);
    }
}
