//! Batch dispatch onto the worker pool and pipeline-wide state.
//!
//! The pipeline owns the worker pool, the shutdown flag, and the counters.
//! Once per cycle the upstream pass calls [`RestructurePipeline::submit`]
//! with that cycle's dirty nodes; each descriptor becomes one low-priority
//! work unit and the whole batch is handed to the pool in a single call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use horizon_mesh::MeshSink;
use horizon_octree::{NodeArena, NodePool};
use horizon_worker::{Job, TaskPriority, WorkerPool};
use serde::{Deserialize, Serialize};

use crate::batch::{DirtyNode, validate_disjoint};
use crate::error::LifecycleError;
use crate::processor::{ProcessOutcome, process_node};

/// What a queued work unit does when it observes the shutdown flag at entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShutdownPolicy {
    /// Units already submitted run in full.
    CompletePending,
    /// Units that have not started yet skip their work and are counted.
    DiscardPending,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        ShutdownPolicy::CompletePending
    }
}

/// What happens when a work unit trips a state-machine precondition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationPolicy {
    /// Log and abort the process. A violation means the tree-mutation
    /// pipeline upstream is broken; continuing risks a corrupt world graph.
    Abort,
    /// Log, count, and drop the unit. For embedding in a host that must
    /// survive.
    Report,
}

impl Default for ViolationPolicy {
    fn default() -> Self {
        ViolationPolicy::Abort
    }
}

/// Tunables for a [`RestructurePipeline`].
#[derive(Clone, Copy, Debug)]
pub struct PipelineOptions {
    /// Worker threads draining restructure units.
    pub worker_threads: usize,
    /// Reject batches that touch one subtree twice before dispatching.
    pub validate_batches: bool,
    pub shutdown_policy: ShutdownPolicy,
    pub violation_policy: ViolationPolicy,
    /// Initial capacity of the reused unit scratch buffer.
    pub scratch_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            worker_threads: 1,
            validate_batches: true,
            shutdown_policy: ShutdownPolicy::default(),
            violation_policy: ViolationPolicy::default(),
            scratch_capacity: 16384,
        }
    }
}

/// Counters shared between the dispatcher and the worker threads.
#[derive(Debug, Default)]
pub struct LifecycleStats {
    submitted: AtomicU64,
    divides: AtomicU64,
    groups: AtomicU64,
    discarded: AtomicU64,
    violations: AtomicU64,
    last_submit_us: AtomicU64,
}

impl LifecycleStats {
    fn add_submitted(&self, count: u64) {
        self.submitted.fetch_add(count, Ordering::Relaxed);
    }

    fn record_divide(&self) {
        self.divides.fetch_add(1, Ordering::Relaxed);
    }

    fn record_group(&self) {
        self.groups.fetch_add(1, Ordering::Relaxed);
    }

    fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_violation(&self) {
        self.violations.fetch_add(1, Ordering::Relaxed);
    }

    fn set_last_submit(&self, elapsed: Duration) {
        self.last_submit_us
            .store(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Consistent-enough copy of all counters for logging and assertions.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            divides: self.divides.load(Ordering::Relaxed),
            groups: self.groups.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            last_submit_us: self.last_submit_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`LifecycleStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Work units handed to the pool.
    pub submitted: u64,
    /// Units that completed a divide.
    pub divides: u64,
    /// Units that completed a group.
    pub groups: u64,
    /// Units skipped after shutdown.
    pub discarded: u64,
    /// Units dropped for a state-machine violation.
    pub violations: u64,
    /// Wall-clock duration of the most recent non-empty submission.
    pub last_submit_us: u64,
}

/// Turns dirty-node batches into concurrently executed restructure units.
///
/// One instance per octree. `submit` runs on the caller's cycle thread;
/// everything else happens on the pool's workers. The `&mut self` receiver
/// keeps dispatch single-threaded, which the reused scratch buffer requires.
pub struct RestructurePipeline<M> {
    arena: Arc<NodeArena>,
    node_pool: Arc<NodePool>,
    mesh: Arc<M>,
    workers: WorkerPool,
    shutdown: Arc<AtomicBool>,
    stats: Arc<LifecycleStats>,
    /// Reused between submissions so steady-state dispatch allocates only
    /// the unit closures themselves.
    scratch: Vec<Job>,
    validate_batches: bool,
    shutdown_policy: ShutdownPolicy,
    violation_policy: ViolationPolicy,
}

impl<M> RestructurePipeline<M>
where
    M: MeshSink + Send + Sync + 'static,
{
    pub fn new(
        arena: Arc<NodeArena>,
        node_pool: Arc<NodePool>,
        mesh: Arc<M>,
        options: PipelineOptions,
    ) -> Self {
        let workers = WorkerPool::new(options.worker_threads);
        tracing::info!(
            "restructure pipeline started: {} worker threads",
            workers.worker_count()
        );
        Self {
            arena,
            node_pool,
            mesh,
            workers,
            shutdown: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(LifecycleStats::default()),
            scratch: Vec::with_capacity(options.scratch_capacity),
            validate_batches: options.validate_batches,
            shutdown_policy: options.shutdown_policy,
            violation_policy: options.violation_policy,
        }
    }

    /// Dispatches one cycle's dirty nodes as work units.
    ///
    /// Builds one lowest-priority unit per descriptor and hands the whole
    /// batch to the pool in a single call, preserving batch order. Does not
    /// wait for execution; the returned duration covers only validation,
    /// unit construction, and hand-off. An empty batch costs nothing and
    /// returns zero. After [`shutdown`](Self::shutdown) the batch is
    /// dropped, also returning zero.
    pub fn submit(&mut self, batch: &[DirtyNode]) -> Result<Duration, LifecycleError> {
        if batch.is_empty() {
            return Ok(Duration::ZERO);
        }
        if self.shutdown.load(Ordering::Relaxed) {
            tracing::warn!(
                "dropping batch of {} descriptors submitted after shutdown",
                batch.len()
            );
            return Ok(Duration::ZERO);
        }

        let start = Instant::now();
        if self.validate_batches {
            validate_disjoint(&self.arena, batch)?;
        }

        for &dirty in batch {
            let arena = Arc::clone(&self.arena);
            let node_pool = Arc::clone(&self.node_pool);
            let mesh = Arc::clone(&self.mesh);
            let shutdown = Arc::clone(&self.shutdown);
            let stats = Arc::clone(&self.stats);
            let shutdown_policy = self.shutdown_policy;
            let violation_policy = self.violation_policy;
            self.scratch.push(Box::new(move || {
                run_unit(
                    dirty,
                    &arena,
                    &node_pool,
                    &*mesh,
                    &shutdown,
                    &stats,
                    shutdown_policy,
                    violation_policy,
                );
            }));
        }

        let queued = self
            .workers
            .add_task_batch(TaskPriority::Low, self.scratch.drain(..));
        self.stats.add_submitted(queued as u64);

        let elapsed = start.elapsed();
        self.stats.set_last_submit(elapsed);
        tracing::trace!(
            "submitted {} restructure units in {}us",
            queued,
            elapsed.as_micros()
        );
        Ok(elapsed)
    }

    /// Stops accepting batches. Idempotent.
    ///
    /// Does not cancel anything already handed to the pool; what queued
    /// units do is decided by the [`ShutdownPolicy`].
    pub fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::Relaxed) {
            tracing::info!("restructure pipeline shutting down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Units handed to the pool and not yet finished.
    pub fn in_flight_count(&self) -> usize {
        self.workers.in_flight_count()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

#[allow(clippy::too_many_arguments)]
fn run_unit<M: MeshSink>(
    dirty: DirtyNode,
    arena: &NodeArena,
    pool: &NodePool,
    mesh: &M,
    shutdown: &AtomicBool,
    stats: &LifecycleStats,
    shutdown_policy: ShutdownPolicy,
    violation_policy: ViolationPolicy,
) {
    if shutdown.load(Ordering::Relaxed) && shutdown_policy == ShutdownPolicy::DiscardPending {
        tracing::trace!("discarding unit for node {} after shutdown", dirty.node);
        stats.record_discarded();
        return;
    }

    match process_node(dirty, arena, pool, mesh) {
        Ok(ProcessOutcome::Divided) => stats.record_divide(),
        Ok(ProcessOutcome::Grouped) => stats.record_group(),
        Err(err) => match violation_policy {
            ViolationPolicy::Abort => {
                tracing::error!("aborting on lifecycle violation: {err}");
                std::process::abort();
            }
            ViolationPolicy::Report => {
                tracing::error!("dropping unit for node {}: {err}", dirty.node);
                stats.record_violation();
            }
        },
    }
}
