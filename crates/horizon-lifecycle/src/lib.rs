//! Node lifecycle orchestration: batch dispatch, divide/group processing,
//! and mesh hand-off sequencing over a shared octree.

pub mod batch;
pub mod error;
pub mod pipeline;
pub mod processor;

pub use batch::{DirtyNode, RestructureOp, validate_disjoint};
pub use error::LifecycleError;
pub use pipeline::{
    LifecycleStats, PipelineOptions, RestructurePipeline, ShutdownPolicy, StatsSnapshot,
    ViolationPolicy,
};
pub use processor::{ProcessOutcome, offer_for_meshing, process_node};
