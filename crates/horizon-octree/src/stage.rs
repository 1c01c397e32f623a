//! Node lifecycle stages.
//!
//! Every world node carries a [`NodeStage`] that records how far it has
//! advanced through creation, restructuring, and mesh generation. Structural
//! operations and the mesh hand-off both gate on it.

/// The lifecycle stage of a world node.
///
/// Stages advance `Creation → MeshWaiting → MeshGenerating → Ready` for the
/// mesh path, with `Splittable` marking nodes the level-of-detail pass has
/// cleared for restructuring. A node entering divide/group processing must be
/// in [`Creation`](NodeStage::Creation) or [`Splittable`](NodeStage::Splittable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeStage {
    /// Freshly created; no mesh work has been requested yet.
    Creation,
    /// Cleared by the level-of-detail pass for a structural change.
    Splittable,
    /// A mesh build for this node is currently running.
    MeshGenerating,
    /// Queued for mesh generation.
    MeshWaiting,
    /// Fully processed; the node is usable by the renderer.
    Ready,
}

impl NodeStage {
    /// Whether a node in this stage may enter divide/group processing.
    pub fn can_restructure(self) -> bool {
        matches!(self, NodeStage::Creation | NodeStage::Splittable)
    }

    /// Whether mesh work for this stage was already requested or completed.
    ///
    /// A recycled node re-entering the tree in one of these stages must not
    /// be offered for meshing a second time.
    pub fn mesh_requested(self) -> bool {
        matches!(
            self,
            NodeStage::MeshGenerating | NodeStage::MeshWaiting | NodeStage::Ready
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_creation_and_splittable_can_restructure() {
        assert!(NodeStage::Creation.can_restructure());
        assert!(NodeStage::Splittable.can_restructure());
        assert!(!NodeStage::MeshGenerating.can_restructure());
        assert!(!NodeStage::MeshWaiting.can_restructure());
        assert!(!NodeStage::Ready.can_restructure());
    }

    #[test]
    fn test_mesh_requested_covers_mesh_lifecycle() {
        assert!(!NodeStage::Creation.mesh_requested());
        assert!(!NodeStage::Splittable.mesh_requested());
        assert!(NodeStage::MeshGenerating.mesh_requested());
        assert!(NodeStage::MeshWaiting.mesh_requested());
        assert!(NodeStage::Ready.mesh_requested());
    }
}
