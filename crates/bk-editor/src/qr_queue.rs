//! Coalescing queue of QR nodes whose stored fallback bitmap is stale.
//!
//! Rendering always regenerates QR codes from metadata; this queue only
//! tracks which nodes' persisted `src` should be rebuilt. Rapid edits to
//! the same node collapse into one pending entry.

use bk_core::NodeId;

#[derive(Debug, Clone, Default)]
pub struct QrRefreshQueue {
    pending: Vec<NodeId>,
}

impl QrRefreshQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the node was already pending.
    pub fn enqueue(&mut self, id: NodeId) -> bool {
        if self.pending.contains(&id) {
            return false;
        }
        self.pending.push(id);
        true
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.pending.contains(&id)
    }

    pub fn forget(&mut self, ids: &[NodeId]) {
        self.pending.retain(|p| !ids.contains(p));
    }

    /// Take every pending id, in first-request order.
    pub fn drain(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_requests_coalesce() {
        let mut queue = QrRefreshQueue::new();
        let (a, b) = (NodeId::intern("qr-a"), NodeId::intern("qr-b"));
        assert!(queue.enqueue(a));
        assert!(queue.enqueue(b));
        assert!(!queue.enqueue(a));
        assert_eq!(queue.drain(), vec![a, b]);
        assert!(queue.is_empty());
    }
}
