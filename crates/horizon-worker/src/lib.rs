//! Prioritized worker thread pool for background node processing.

pub mod pool;
pub mod task;

pub use pool::WorkerPool;
pub use task::{Job, TaskPriority};
