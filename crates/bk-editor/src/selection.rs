//! Ordered selection of node ids.

use bk_core::NodeId;
use smallvec::SmallVec;

/// Selected nodes in click order. The first entry is the primary
/// selection the property panel shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: SmallVec<[NodeId; 4]>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn primary(&self) -> Option<NodeId> {
        self.ids.first().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }

    /// Replace the selection with one node.
    pub fn select(&mut self, id: NodeId) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Shift+click: add when absent, remove when present.
    pub fn toggle(&mut self, id: NodeId) {
        if let Some(pos) = self.ids.iter().position(|s| *s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id);
        }
    }

    /// Drop ids. Returns whether anything changed.
    pub fn remove_all(&mut self, ids: &[NodeId]) -> bool {
        let before = self.ids.len();
        self.ids.retain(|s| !ids.contains(s));
        self.ids.len() != before
    }

    pub fn set(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.ids.clear();
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
