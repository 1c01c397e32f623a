//! Lifecycle error types.

use horizon_octree::{NodeHandle, NodeStage, OctreeError};
use thiserror::Error;

/// Errors raised by batch validation and node processing.
///
/// Everything except the two batch-validation variants is an invariant
/// violation: the upstream batch producer issued a request the node state
/// machine forbids. What happens to a violating work unit is decided by
/// [`ViolationPolicy`](crate::pipeline::ViolationPolicy).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// The arena rejected a structural operation.
    #[error("octree invariant violated: {0}")]
    Invariant(#[from] OctreeError),

    /// A node entered processing in a stage that forbids restructuring.
    #[error("node {node} cannot restructure in stage {stage:?}")]
    StageNotRestructurable { node: NodeHandle, stage: NodeStage },

    /// A node was offered for meshing in a stage outside the mesh lifecycle.
    #[error("node {node} in stage {stage:?} cannot be offered for meshing")]
    UnexpectedMeshStage { node: NodeHandle, stage: NodeStage },

    /// A group target's child was still active.
    #[error("child {child} of node {parent} is still active")]
    ChildActive { parent: NodeHandle, child: NodeHandle },

    /// One batch named the same node twice.
    #[error("batch names node {node} more than once")]
    DuplicateNode { node: NodeHandle },

    /// One batch named both a node and one of its ancestors.
    #[error("batch restructures node {descendant} and its ancestor {ancestor}")]
    OverlappingBatch {
        ancestor: NodeHandle,
        descendant: NodeHandle,
    },
}
