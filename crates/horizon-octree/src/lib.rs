//! Octree world storage: handle-indexed node arena, lifecycle stages, and slot pooling.

pub mod arena;
pub mod error;
pub mod node;
pub mod pool;
pub mod stage;

pub use arena::NodeArena;
pub use error::OctreeError;
pub use node::{NodeBounds, NodeHandle, WorldNode};
pub use pool::NodePool;
pub use stage::NodeStage;
