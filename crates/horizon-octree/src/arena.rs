//! Handle-indexed node storage.
//!
//! All octree nodes live in a [`NodeArena`]; the tree itself is just handles
//! pointing at other handles. Worker threads and the dispatcher share one
//! arena, so every access goes through a short-lived map guard and structural
//! edits touch one node at a time.

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

use crate::error::OctreeError;
use crate::node::{NodeBounds, NodeHandle, WorldNode};
use crate::pool::NodePool;
use crate::stage::NodeStage;

/// Concurrent storage for [`WorldNode`]s, addressed by [`NodeHandle`].
///
/// Slots are never removed: a node released through a [`NodePool`] stays
/// resident with its stage and active flag intact, and [`divide`](Self::divide)
/// rewires only the structural fields when it pulls the slot back out. A
/// stale handle therefore still reads the node it always referred to.
///
/// Methods never hold more than one map guard at a time; reads come back as
/// whole-value snapshots.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: DashMap<NodeHandle, WorldNode>,
    next: AtomicU32,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&self, node: WorldNode) -> NodeHandle {
        let handle = NodeHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.nodes.insert(handle, node);
        handle
    }

    /// Inserts a new root node covering `bounds`.
    pub fn insert_root(&self, bounds: NodeBounds) -> NodeHandle {
        self.alloc(WorldNode::root(bounds))
    }

    /// Reads the whole node in one guarded access.
    pub fn snapshot(&self, handle: NodeHandle) -> Result<WorldNode, OctreeError> {
        self.nodes
            .get(&handle)
            .map(|node| *node)
            .ok_or(OctreeError::Dangling(handle))
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(&handle)
    }

    pub fn stage(&self, handle: NodeHandle) -> Result<NodeStage, OctreeError> {
        self.snapshot(handle).map(|node| node.stage)
    }

    pub fn set_stage(&self, handle: NodeHandle, stage: NodeStage) -> Result<(), OctreeError> {
        let mut node = self
            .nodes
            .get_mut(&handle)
            .ok_or(OctreeError::Dangling(handle))?;
        node.stage = stage;
        Ok(())
    }

    pub fn parent(&self, handle: NodeHandle) -> Result<Option<NodeHandle>, OctreeError> {
        self.snapshot(handle).map(|node| node.parent)
    }

    pub fn children(&self, handle: NodeHandle) -> Result<Option<[NodeHandle; 8]>, OctreeError> {
        self.snapshot(handle).map(|node| node.children)
    }

    pub fn is_active(&self, handle: NodeHandle) -> Result<bool, OctreeError> {
        self.snapshot(handle).map(|node| node.active)
    }

    pub fn set_active(&self, handle: NodeHandle, active: bool) -> Result<(), OctreeError> {
        let mut node = self
            .nodes
            .get_mut(&handle)
            .ok_or(OctreeError::Dangling(handle))?;
        node.active = active;
        Ok(())
    }

    /// Divides a leaf into eight children occupying its octants.
    ///
    /// Child slots come from `pool` while it has any, otherwise they are
    /// freshly allocated. Recycled slots keep their stage and active flag;
    /// fresh ones start in [`NodeStage::Creation`]. The parent is linked to
    /// the children only after every child slot is written.
    pub fn divide(
        &self,
        parent: NodeHandle,
        pool: &NodePool,
    ) -> Result<[NodeHandle; 8], OctreeError> {
        let parent_node = self.snapshot(parent)?;
        if parent_node.children.is_some() {
            return Err(OctreeError::DivideNonLeaf(parent));
        }

        let depth = parent_node.depth.saturating_add(1);
        let mut children = [NodeHandle(0); 8];
        for (index, slot) in children.iter_mut().enumerate() {
            let bounds = parent_node.bounds.octant(index as u8);
            *slot = match pool.acquire() {
                Some(handle) => {
                    self.rewire(handle, parent, bounds, depth)?;
                    handle
                }
                None => self.alloc(WorldNode::child_of(parent, bounds, depth)),
            };
        }

        let mut node = self
            .nodes
            .get_mut(&parent)
            .ok_or(OctreeError::Dangling(parent))?;
        node.children = Some(children);
        node.leaf = false;
        Ok(children)
    }

    /// Repoints a recycled slot at a new position in the tree.
    ///
    /// Stage and active flag are deliberately left as the pooled node last
    /// held them.
    fn rewire(
        &self,
        handle: NodeHandle,
        parent: NodeHandle,
        bounds: NodeBounds,
        depth: u8,
    ) -> Result<(), OctreeError> {
        let mut node = self
            .nodes
            .get_mut(&handle)
            .ok_or(OctreeError::Dangling(handle))?;
        node.parent = Some(parent);
        node.children = None;
        node.leaf = true;
        node.bounds = bounds;
        node.depth = depth;
        Ok(())
    }

    /// Unlinks a node from its parent and marks it a leaf, ready for pooling.
    pub fn detach(&self, handle: NodeHandle) -> Result<(), OctreeError> {
        let mut node = self
            .nodes
            .get_mut(&handle)
            .ok_or(OctreeError::Dangling(handle))?;
        if node.children.is_some() {
            return Err(OctreeError::MergeWithChildren(handle));
        }
        node.parent = None;
        node.leaf = true;
        Ok(())
    }

    /// Drops a divided node's child links, making it a leaf again.
    pub fn merge_into_leaf(&self, handle: NodeHandle) -> Result<(), OctreeError> {
        let mut node = self
            .nodes
            .get_mut(&handle)
            .ok_or(OctreeError::Dangling(handle))?;
        if node.children.is_none() {
            return Err(OctreeError::NoChildren(handle));
        }
        node.children = None;
        node.leaf = true;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
