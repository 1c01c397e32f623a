//! Mesh-generation hand-off: the sink restructuring workers enqueue nodes
//! into, and a channel-backed queue the meshing stage drains.

use crossbeam_channel::{Receiver, Sender, unbounded};
use horizon_octree::NodeHandle;

/// Destination for nodes whose mesh should be (re)built.
///
/// Implementations must tolerate calls from multiple worker threads.
pub trait MeshSink {
    /// Accepts a node for mesh generation.
    fn enqueue(&self, node: NodeHandle);
}

impl<F> MeshSink for F
where
    F: Fn(NodeHandle),
{
    fn enqueue(&self, node: NodeHandle) {
        self(node)
    }
}

/// Unbounded queue of nodes awaiting mesh generation.
///
/// Workers enqueue through the [`MeshSink`] impl; the meshing stage drains
/// on its own schedule, typically once per frame.
#[derive(Debug, Clone)]
pub struct MeshQueue {
    sender: Sender<NodeHandle>,
    receiver: Receiver<NodeHandle>,
}

impl MeshQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Removes and returns every node currently queued.
    pub fn drain(&self) -> Vec<NodeHandle> {
        let mut nodes = Vec::new();
        while let Ok(node) = self.receiver.try_recv() {
            nodes.push(node);
        }
        nodes
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for MeshQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshSink for MeshQueue {
    fn enqueue(&self, node: NodeHandle) {
        // Both channel ends live in this struct, so the send cannot fail.
        let _ = self.sender.send(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_nodes_in_enqueue_order() {
        let queue = MeshQueue::new();
        queue.enqueue(NodeHandle(3));
        queue.enqueue(NodeHandle(1));
        queue.enqueue(NodeHandle(2));

        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.drain(),
            vec![NodeHandle(3), NodeHandle(1), NodeHandle(2)]
        );
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_clones_share_one_queue() {
        let queue = MeshQueue::new();
        let handle = queue.clone();
        handle.enqueue(NodeHandle(9));
        assert_eq!(queue.drain(), vec![NodeHandle(9)]);
    }

    #[test]
    fn test_closure_acts_as_sink() {
        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |node: NodeHandle| seen.lock().unwrap().push(node);
        sink.enqueue(NodeHandle(4));
        sink.enqueue(NodeHandle(5));
        assert_eq!(*seen.lock().unwrap(), vec![NodeHandle(4), NodeHandle(5)]);
    }
}
