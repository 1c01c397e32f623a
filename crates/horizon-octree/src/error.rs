//! Octree error types.

use thiserror::Error;

use crate::node::NodeHandle;

/// Errors raised by structural octree operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OctreeError {
    /// A handle did not resolve to a live arena slot.
    #[error("node {0} does not exist in the arena")]
    Dangling(NodeHandle),

    /// Divide was requested on a node that already has children.
    #[error("node {0} cannot divide: it already has children")]
    DivideNonLeaf(NodeHandle),

    /// A node still holding children was about to become a leaf.
    #[error("node {0} cannot become a leaf: children are still attached")]
    MergeWithChildren(NodeHandle),

    /// An operation expected children on a node that has none.
    #[error("node {0} has no children")]
    NoChildren(NodeHandle),
}
