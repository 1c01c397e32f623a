//! Dirty-node descriptors and batch validation.
//!
//! The level-of-detail pass hands the pipeline a batch of descriptors once
//! per cycle. Work units from one batch run concurrently in any order, so a
//! batch is only safe when no two descriptors touch the same subtree;
//! [`validate_disjoint`] makes that contract checkable instead of assumed.

use horizon_octree::{NodeArena, NodeHandle};
use rustc_hash::FxHashSet;

use crate::error::LifecycleError;

/// Structural operation requested for a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RestructureOp {
    /// Split a leaf into eight children.
    Divide,
    /// Merge eight children back into their parent.
    Group,
}

/// One node the upstream pass wants restructured this cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyNode {
    pub node: NodeHandle,
    pub op: RestructureOp,
}

impl DirtyNode {
    pub fn divide(node: NodeHandle) -> Self {
        Self {
            node,
            op: RestructureOp::Divide,
        }
    }

    pub fn group(node: NodeHandle) -> Self {
        Self {
            node,
            op: RestructureOp::Group,
        }
    }
}

/// Checks that no two descriptors in `batch` name the same node or nodes on
/// one ancestor chain.
///
/// Walks each target's parent chain against the set of batch targets. Cost
/// is batch size times tree depth, which stays negligible next to the
/// structural work the batch triggers.
pub fn validate_disjoint(arena: &NodeArena, batch: &[DirtyNode]) -> Result<(), LifecycleError> {
    let mut targets = FxHashSet::default();
    for dirty in batch {
        if !targets.insert(dirty.node) {
            return Err(LifecycleError::DuplicateNode { node: dirty.node });
        }
    }

    for dirty in batch {
        let mut current = arena.parent(dirty.node)?;
        while let Some(ancestor) = current {
            if targets.contains(&ancestor) {
                return Err(LifecycleError::OverlappingBatch {
                    ancestor,
                    descendant: dirty.node,
                });
            }
            current = arena.parent(ancestor)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_octree::{NodeBounds, NodePool, OctreeError};

    fn divided_root(arena: &NodeArena) -> (NodeHandle, [NodeHandle; 8]) {
        let root = arena.insert_root(NodeBounds::new(0, 0, 0, 64));
        let children = arena.divide(root, &NodePool::new()).unwrap();
        (root, children)
    }

    #[test]
    fn test_empty_and_sibling_batches_are_disjoint() {
        let arena = NodeArena::new();
        let (_, children) = divided_root(&arena);

        assert_eq!(validate_disjoint(&arena, &[]), Ok(()));
        let batch: Vec<DirtyNode> = children.iter().map(|&c| DirtyNode::divide(c)).collect();
        assert_eq!(validate_disjoint(&arena, &batch), Ok(()));
    }

    #[test]
    fn test_duplicate_target_is_rejected() {
        let arena = NodeArena::new();
        let (root, _) = divided_root(&arena);

        let batch = [DirtyNode::divide(root), DirtyNode::group(root)];
        assert_eq!(
            validate_disjoint(&arena, &batch),
            Err(LifecycleError::DuplicateNode { node: root })
        );
    }

    #[test]
    fn test_ancestor_descendant_pair_is_rejected() {
        let arena = NodeArena::new();
        let (root, children) = divided_root(&arena);
        let grandchildren = arena.divide(children[0], &NodePool::new()).unwrap();

        // The overlap is found from the descendant even when the ancestor
        // comes first in the batch.
        let batch = [
            DirtyNode::group(root),
            DirtyNode::divide(grandchildren[3]),
        ];
        assert_eq!(
            validate_disjoint(&arena, &batch),
            Err(LifecycleError::OverlappingBatch {
                ancestor: root,
                descendant: grandchildren[3],
            })
        );
    }

    #[test]
    fn test_dangling_target_is_an_invariant_error() {
        let arena = NodeArena::new();
        let ghost = NodeHandle(99);
        let batch = [DirtyNode::divide(ghost)];
        assert_eq!(
            validate_disjoint(&arena, &batch),
            Err(LifecycleError::Invariant(OctreeError::Dangling(ghost)))
        );
    }
}
