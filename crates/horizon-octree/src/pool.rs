//! Free-list pool for recycled node slots.

use std::sync::Mutex;

use crate::node::NodeHandle;

/// A pool of arena slots released by group operations.
///
/// Pooled nodes stay resident in the arena: their stage and active flag are
/// left untouched so a handle that was offered for meshing before pooling is
/// still recognized as processed if the slot is reused. Only the structural
/// fields are rewritten when [`NodeArena::divide`](crate::arena::NodeArena::divide)
/// pulls a slot back out.
#[derive(Debug, Default)]
pub struct NodePool {
    free: Mutex<Vec<NodeHandle>>,
}

impl NodePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a detached slot to the pool.
    pub fn add(&self, handle: NodeHandle) {
        self.free.lock().unwrap().push(handle);
    }

    /// Takes a slot from the pool, most recently released first.
    pub fn acquire(&self) -> Option<NodeHandle> {
        self.free.lock().unwrap().pop()
    }

    pub fn len(&self) -> usize {
        self.free.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_acquire_is_lifo() {
        let pool = NodePool::new();
        pool.add(NodeHandle(1));
        pool.add(NodeHandle(2));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.acquire(), Some(NodeHandle(2)));
        assert_eq!(pool.acquire(), Some(NodeHandle(1)));
        assert_eq!(pool.acquire(), None);
        assert!(pool.is_empty());
    }
}
