//! Per-node restructuring: the work each unit performs on a worker thread.

use horizon_mesh::MeshSink;
use horizon_octree::{NodeArena, NodeHandle, NodePool, NodeStage, OctreeError};

use crate::batch::{DirtyNode, RestructureOp};
use crate::error::LifecycleError;

/// Which structural mutation a successful unit performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    Divided,
    Grouped,
}

/// Executes one descriptor against the tree.
///
/// The target must be in a restructurable stage. A divide splits the leaf,
/// offers each child for meshing, and marks the parent `Ready` (the parent
/// became internal; only the new leaves need mesh work). A group validates
/// the whole child set, then detaches and pools every child before the
/// merge, so the merge never sees a half-released set, and finally marks
/// the node `Ready`.
///
/// Errors leave the group path untouched; a divide that trips on a recycled
/// child's stage reports after the structural split already happened.
pub fn process_node<M: MeshSink>(
    dirty: DirtyNode,
    arena: &NodeArena,
    pool: &NodePool,
    mesh: &M,
) -> Result<ProcessOutcome, LifecycleError> {
    let stage = arena.stage(dirty.node)?;
    if !stage.can_restructure() {
        return Err(LifecycleError::StageNotRestructurable {
            node: dirty.node,
            stage,
        });
    }

    match dirty.op {
        RestructureOp::Divide => {
            let children = arena.divide(dirty.node, pool)?;
            for child in children {
                offer_for_meshing(arena, mesh, child)?;
            }
            arena.set_stage(dirty.node, NodeStage::Ready)?;
            Ok(ProcessOutcome::Divided)
        }
        RestructureOp::Group => {
            let children = arena
                .children(dirty.node)?
                .ok_or(OctreeError::NoChildren(dirty.node))?;

            for child in children {
                let node = arena.snapshot(child)?;
                if node.active {
                    return Err(LifecycleError::ChildActive {
                        parent: dirty.node,
                        child,
                    });
                }
                if node.children.is_some() {
                    return Err(OctreeError::MergeWithChildren(child).into());
                }
            }

            for child in children {
                arena.detach(child)?;
                pool.add(child);
            }
            arena.merge_into_leaf(dirty.node)?;
            arena.set_stage(dirty.node, NodeStage::Ready)?;
            Ok(ProcessOutcome::Grouped)
        }
    }
}

/// Offers a node to the mesh stage, at most once per lifecycle.
///
/// The decision is made from one stage read. A node still in `Creation`
/// moves to `MeshWaiting` and is enqueued; a node whose mesh work was
/// already requested or completed is left alone and `Ok(false)` is
/// returned. Any other stage is a state-machine breach.
pub fn offer_for_meshing<M: MeshSink>(
    arena: &NodeArena,
    mesh: &M,
    node: NodeHandle,
) -> Result<bool, LifecycleError> {
    let stage = arena.stage(node)?;
    if stage == NodeStage::Creation {
        arena.set_stage(node, NodeStage::MeshWaiting)?;
        mesh.enqueue(node);
        return Ok(true);
    }
    if stage.mesh_requested() {
        return Ok(false);
    }
    Err(LifecycleError::UnexpectedMeshStage { node, stage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_mesh::MeshQueue;
    use horizon_octree::NodeBounds;

    fn world() -> (NodeArena, NodePool, MeshQueue, NodeHandle) {
        let arena = NodeArena::new();
        let root = arena.insert_root(NodeBounds::new(0, 0, 0, 64));
        (arena, NodePool::new(), MeshQueue::new(), root)
    }

    #[test]
    fn test_divide_readies_parent_and_offers_every_child() {
        let (arena, pool, mesh, root) = world();

        let outcome = process_node(DirtyNode::divide(root), &arena, &pool, &mesh).unwrap();
        assert_eq!(outcome, ProcessOutcome::Divided);
        assert_eq!(arena.stage(root).unwrap(), NodeStage::Ready);

        let children = arena.children(root).unwrap().unwrap();
        for child in children {
            assert_eq!(arena.stage(child).unwrap(), NodeStage::MeshWaiting);
        }
        let mut offered = mesh.drain();
        offered.sort();
        let mut expected = children.to_vec();
        expected.sort();
        assert_eq!(offered, expected);
    }

    #[test]
    fn test_divide_works_from_splittable() {
        let (arena, pool, mesh, root) = world();
        arena.set_stage(root, NodeStage::Splittable).unwrap();

        process_node(DirtyNode::divide(root), &arena, &pool, &mesh).unwrap();
        assert_eq!(arena.stage(root).unwrap(), NodeStage::Ready);
    }

    #[test]
    fn test_group_pools_children_and_readies_node() {
        let (arena, pool, mesh, root) = world();
        process_node(DirtyNode::divide(root), &arena, &pool, &mesh).unwrap();
        let children = arena.children(root).unwrap().unwrap();
        for child in children {
            arena.set_active(child, false).unwrap();
        }
        arena.set_stage(root, NodeStage::Splittable).unwrap();

        let outcome = process_node(DirtyNode::group(root), &arena, &pool, &mesh).unwrap();
        assert_eq!(outcome, ProcessOutcome::Grouped);
        assert_eq!(arena.stage(root).unwrap(), NodeStage::Ready);
        assert_eq!(arena.children(root).unwrap(), None);
        assert!(arena.snapshot(root).unwrap().is_leaf());
        assert_eq!(pool.len(), 8);

        for child in children {
            let node = arena.snapshot(child).unwrap();
            assert_eq!(node.parent, None);
            assert!(node.is_leaf());
        }
    }

    #[test]
    fn test_recycled_children_are_not_offered_again() {
        let (arena, pool, mesh, root) = world();
        process_node(DirtyNode::divide(root), &arena, &pool, &mesh).unwrap();
        let first = arena.children(root).unwrap().unwrap();
        assert_eq!(mesh.drain().len(), 8);

        // Mesh pipeline finishes; the nodes later leave the visible set.
        for child in first {
            arena.set_stage(child, NodeStage::Ready).unwrap();
            arena.set_active(child, false).unwrap();
        }
        arena.set_stage(root, NodeStage::Splittable).unwrap();
        process_node(DirtyNode::group(root), &arena, &pool, &mesh).unwrap();

        arena.set_stage(root, NodeStage::Splittable).unwrap();
        process_node(DirtyNode::divide(root), &arena, &pool, &mesh).unwrap();

        let second = arena.children(root).unwrap().unwrap();
        assert!(mesh.drain().is_empty());
        for child in second {
            assert_eq!(arena.stage(child).unwrap(), NodeStage::Ready);
        }
    }

    #[test]
    fn test_offer_is_idempotent() {
        let (arena, _, mesh, root) = world();

        assert_eq!(offer_for_meshing(&arena, &mesh, root), Ok(true));
        assert_eq!(arena.stage(root).unwrap(), NodeStage::MeshWaiting);
        assert_eq!(offer_for_meshing(&arena, &mesh, root), Ok(false));
        assert_eq!(mesh.drain(), vec![root]);
    }

    #[test]
    fn test_offer_rejects_splittable() {
        let (arena, _, mesh, root) = world();
        arena.set_stage(root, NodeStage::Splittable).unwrap();

        assert_eq!(
            offer_for_meshing(&arena, &mesh, root),
            Err(LifecycleError::UnexpectedMeshStage {
                node: root,
                stage: NodeStage::Splittable,
            })
        );
        assert!(mesh.drain().is_empty());
    }

    #[test]
    fn test_processing_rejects_ready_nodes() {
        let (arena, pool, mesh, root) = world();
        arena.set_stage(root, NodeStage::Ready).unwrap();

        assert_eq!(
            process_node(DirtyNode::divide(root), &arena, &pool, &mesh),
            Err(LifecycleError::StageNotRestructurable {
                node: root,
                stage: NodeStage::Ready,
            })
        );
    }

    #[test]
    fn test_group_rejects_active_child_before_mutating() {
        let (arena, pool, mesh, root) = world();
        process_node(DirtyNode::divide(root), &arena, &pool, &mesh).unwrap();
        let children = arena.children(root).unwrap().unwrap();
        for child in children {
            arena.set_active(child, false).unwrap();
        }
        arena.set_active(children[5], true).unwrap();
        arena.set_stage(root, NodeStage::Splittable).unwrap();

        assert_eq!(
            process_node(DirtyNode::group(root), &arena, &pool, &mesh),
            Err(LifecycleError::ChildActive {
                parent: root,
                child: children[5],
            })
        );

        // Nothing was released: the tree still holds all eight children.
        assert_eq!(pool.len(), 0);
        assert_eq!(arena.children(root).unwrap(), Some(children));
        for child in children {
            assert_eq!(arena.snapshot(child).unwrap().parent, Some(root));
        }
    }

    #[test]
    fn test_group_rejects_leafless_target() {
        let (arena, pool, mesh, root) = world();
        assert_eq!(
            process_node(DirtyNode::group(root), &arena, &pool, &mesh),
            Err(LifecycleError::Invariant(OctreeError::NoChildren(root)))
        );
    }

    #[test]
    fn test_dangling_descriptor_is_an_invariant_error() {
        let (arena, pool, mesh, _) = world();
        let ghost = NodeHandle(1234);
        assert_eq!(
            process_node(DirtyNode::divide(ghost), &arena, &pool, &mesh),
            Err(LifecycleError::Invariant(OctreeError::Dangling(ghost)))
        );
    }
}
