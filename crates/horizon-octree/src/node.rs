//! World node data and spatial bounds.

use std::fmt;

use crate::stage::NodeStage;

/// Identifies a node slot in a [`NodeArena`](crate::arena::NodeArena).
///
/// Handles are plain indices: a slot recycled through the node pool keeps its
/// handle, its stage, and its active flag, so a handle observed before
/// recycling still refers to the same logical node afterwards. The mesh
/// hand-off relies on that to recognize already-processed nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u32);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned cubic bounds of a node in world units.
///
/// `size` is the edge length; children occupy the eight half-size octants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeBounds {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub size: i64,
}

impl NodeBounds {
    pub fn new(x: i64, y: i64, z: i64, size: i64) -> Self {
        Self { x, y, z, size }
    }

    /// Bounds of the octant selected by the low three bits of `index`.
    ///
    /// Bit 0 offsets x, bit 1 offsets y, bit 2 offsets z, matching the child
    /// ordering produced by [`NodeArena::divide`](crate::arena::NodeArena::divide).
    pub fn octant(&self, index: u8) -> NodeBounds {
        debug_assert!(index < 8);
        debug_assert!(self.size >= 2, "octant of unit-size bounds");
        let half = self.size / 2;
        NodeBounds {
            x: self.x + if index & 1 != 0 { half } else { 0 },
            y: self.y + if index & 2 != 0 { half } else { 0 },
            z: self.z + if index & 4 != 0 { half } else { 0 },
            size: half,
        }
    }

    /// Center point of the bounds.
    pub fn center(&self) -> (i64, i64, i64) {
        let half = self.size / 2;
        (self.x + half, self.y + half, self.z + half)
    }
}

/// A single octree node.
///
/// Nodes are small and `Copy` so arena reads can hand out whole-value
/// snapshots instead of holding map guards across caller code.
///
/// `children` is `Some` exactly when the node has been divided; a divided
/// node always has all eight children. `parent` is a non-owning back
/// reference; the root carries `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldNode {
    pub stage: NodeStage,
    pub parent: Option<NodeHandle>,
    pub children: Option<[NodeHandle; 8]>,
    pub leaf: bool,
    pub active: bool,
    pub bounds: NodeBounds,
    pub depth: u8,
}

impl WorldNode {
    /// A root node covering `bounds` at depth 0.
    pub fn root(bounds: NodeBounds) -> Self {
        Self {
            stage: NodeStage::Creation,
            parent: None,
            children: None,
            leaf: true,
            active: true,
            bounds,
            depth: 0,
        }
    }

    /// A fresh leaf child of `parent`.
    pub fn child_of(parent: NodeHandle, bounds: NodeBounds, depth: u8) -> Self {
        Self {
            stage: NodeStage::Creation,
            parent: Some(parent),
            children: None,
            leaf: true,
            active: true,
            bounds,
            depth,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octant_offsets_follow_index_bits() {
        let bounds = NodeBounds::new(0, 0, 0, 32);
        assert_eq!(bounds.octant(0), NodeBounds::new(0, 0, 0, 16));
        assert_eq!(bounds.octant(1), NodeBounds::new(16, 0, 0, 16));
        assert_eq!(bounds.octant(2), NodeBounds::new(0, 16, 0, 16));
        assert_eq!(bounds.octant(4), NodeBounds::new(0, 0, 16, 16));
        assert_eq!(bounds.octant(7), NodeBounds::new(16, 16, 16, 16));
    }

    #[test]
    fn test_center_of_cube() {
        let bounds = NodeBounds::new(-16, -16, -16, 32);
        assert_eq!(bounds.center(), (0, 0, 0));
    }

    #[test]
    fn test_root_node_defaults() {
        let node = WorldNode::root(NodeBounds::new(0, 0, 0, 64));
        assert_eq!(node.stage, NodeStage::Creation);
        assert!(node.parent.is_none());
        assert!(node.children.is_none());
        assert!(node.is_leaf());
        assert!(node.active);
        assert_eq!(node.depth, 0);
    }

    #[test]
    fn test_child_links_back_to_parent() {
        let parent = NodeHandle(3);
        let node = WorldNode::child_of(parent, NodeBounds::new(0, 0, 0, 16), 2);
        assert_eq!(node.parent, Some(parent));
        assert!(node.is_leaf());
        assert_eq!(node.depth, 2);
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(NodeHandle(42).to_string(), "#42");
    }
}
