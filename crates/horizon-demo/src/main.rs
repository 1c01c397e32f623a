//! Demo binary driving the restructure pipeline through approach and retreat
//! cycles.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI
//! flags. Run with `cargo run -p horizon-demo` to watch an octree subdivide
//! around a viewpoint flying toward the origin, collapse again as it pulls
//! back, and finally re-divide out of the node pool without rebuilding any
//! meshes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use horizon_config::{CliArgs, Config};
use horizon_lifecycle::{DirtyNode, RestructurePipeline};
use horizon_mesh::MeshQueue;
use horizon_octree::{NodeArena, NodeBounds, NodeHandle, NodePool, NodeStage};
use tracing::info;

/// Synthetic camera position in world units.
#[derive(Clone, Copy, Debug)]
struct Viewpoint {
    x: i64,
    y: i64,
    z: i64,
}

impl Viewpoint {
    fn distance_to(&self, point: (i64, i64, i64)) -> f64 {
        let dx = (self.x - point.0) as f64;
        let dy = (self.y - point.1) as f64;
        let dz = (self.z - point.2) as f64;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Distance rule shared by both collectors: a node holds detail while the
/// viewpoint is closer than twice its edge length.
fn wants_detail(view: Viewpoint, bounds: NodeBounds) -> bool {
    view.distance_to(bounds.center()) < bounds.size as f64 * 2.0
}

/// Walks the tree and returns one divide descriptor per leaf that should
/// gain detail. Leaves are never each other's ancestors, so the batch is
/// disjoint by construction.
fn collect_divide_targets(
    arena: &NodeArena,
    root: NodeHandle,
    view: Viewpoint,
    max_depth: u8,
) -> Vec<DirtyNode> {
    let mut batch = Vec::new();
    let mut stack = vec![root];
    while let Some(handle) = stack.pop() {
        let node = arena
            .snapshot(handle)
            .expect("tree walk hit a dangling handle");
        if let Some(children) = node.children {
            stack.extend(children);
            continue;
        }
        if node.depth >= max_depth || node.bounds.size < 2 || !wants_detail(view, node.bounds) {
            continue;
        }
        // Finished leaves move back to Splittable so the pipeline accepts
        // them again; leaves mid-meshing are left for a later cycle.
        let stage = if node.stage == NodeStage::Ready {
            arena
                .set_stage(handle, NodeStage::Splittable)
                .expect("tree walk hit a dangling handle");
            NodeStage::Splittable
        } else {
            node.stage
        };
        if stage.can_restructure() {
            batch.push(DirtyNode::divide(handle));
        }
    }
    batch
}

/// Finds divided nodes whose children are all leaves and no longer close
/// enough to the viewpoint, deactivates those children, and returns one
/// group descriptor per parent. Parents of leaf-only children cannot contain
/// one another, so the batch is disjoint.
fn collect_group_targets(arena: &NodeArena, root: NodeHandle, view: Viewpoint) -> Vec<DirtyNode> {
    let mut batch = Vec::new();
    let mut stack = vec![root];
    while let Some(handle) = stack.pop() {
        let node = arena
            .snapshot(handle)
            .expect("tree walk hit a dangling handle");
        let Some(children) = node.children else {
            continue;
        };
        let all_leaves = children.iter().all(|&child| {
            arena
                .snapshot(child)
                .expect("tree walk hit a dangling handle")
                .is_leaf()
        });
        if !all_leaves {
            stack.extend(children);
            continue;
        }
        if wants_detail(view, node.bounds) {
            continue;
        }
        // The renderer stops drawing the leaves before the merge; the
        // pipeline refuses to recycle nodes still flagged active.
        for &child in &children {
            arena
                .set_active(child, false)
                .expect("tree walk hit a dangling handle");
        }
        if node.stage == NodeStage::Ready {
            arena
                .set_stage(handle, NodeStage::Splittable)
                .expect("tree walk hit a dangling handle");
        }
        batch.push(DirtyNode::group(handle));
    }
    batch
}

/// Stands in for the mesh generator: every queued node gets its mesh "built"
/// and is activated for rendering.
fn build_queued_meshes(arena: &NodeArena, queue: &MeshQueue) -> usize {
    let handles = queue.drain();
    for &handle in &handles {
        arena
            .set_stage(handle, NodeStage::MeshGenerating)
            .expect("queued node vanished");
        arena
            .set_stage(handle, NodeStage::Ready)
            .expect("queued node vanished");
        arena
            .set_active(handle, true)
            .expect("queued node vanished");
    }
    handles.len()
}

/// Reactivates leaves whose recycled slot still holds a finished mesh.
/// These never re-entered the queue; the mesh hand-off recognized their
/// stage and skipped them.
fn reactivate_cached_leaves(arena: &NodeArena, root: NodeHandle) -> usize {
    let mut count = 0;
    let mut stack = vec![root];
    while let Some(handle) = stack.pop() {
        let node = arena
            .snapshot(handle)
            .expect("tree walk hit a dangling handle");
        if let Some(children) = node.children {
            stack.extend(children);
        } else if node.stage == NodeStage::Ready && !node.active {
            arena
                .set_active(handle, true)
                .expect("tree walk hit a dangling handle");
            count += 1;
        }
    }
    count
}

/// Leaf count and deepest level currently in the tree.
fn tree_stats(arena: &NodeArena, root: NodeHandle) -> (usize, u8) {
    let mut leaves = 0;
    let mut deepest = 0;
    let mut stack = vec![root];
    while let Some(handle) = stack.pop() {
        let node = arena
            .snapshot(handle)
            .expect("tree walk hit a dangling handle");
        deepest = deepest.max(node.depth);
        match node.children {
            Some(children) => stack.extend(children),
            None => leaves += 1,
        }
    }
    (leaves, deepest)
}

fn wait_for_idle(pipeline: &RestructurePipeline<MeshQueue>, what: &str) {
    let start = Instant::now();
    while pipeline.in_flight_count() > 0 {
        assert!(
            start.elapsed().as_secs() < 10,
            "Timed out waiting for {what} units to finish"
        );
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn log_stats(pipeline: &RestructurePipeline<MeshQueue>) {
    let stats = pipeline.stats();
    info!(
        "pipeline stats: {} submitted, {} divides, {} groups, {} discarded, {} violations, last submit {}us",
        stats.submitted,
        stats.divides,
        stats.groups,
        stats.discarded,
        stats.violations,
        stats.last_submit_us
    );
}

fn run_simulation(config: &Config, cycles: u32) {
    let extent = config.world.root_extent.max(2);
    let max_depth = config.world.max_depth;
    info!("world: root extent {extent}, max depth {max_depth}, {cycles} approach cycles");

    let arena = Arc::new(NodeArena::new());
    let node_pool = Arc::new(NodePool::new());
    let mesh = Arc::new(MeshQueue::new());
    let half = extent / 2;
    let root = arena.insert_root(NodeBounds::new(-half, -half, -half, extent));

    let mut pipeline = RestructurePipeline::new(
        Arc::clone(&arena),
        Arc::clone(&node_pool),
        Arc::clone(&mesh),
        config.pipeline_options(),
    );

    // Fly toward the origin; each cycle subdivides the leaves the viewpoint
    // gets close to, then completes their meshes.
    let mut view = Viewpoint {
        x: extent,
        y: extent / 4,
        z: 0,
    };
    for cycle in 0..cycles {
        let batch = collect_divide_targets(&arena, root, view, max_depth);
        let elapsed = pipeline
            .submit(&batch)
            .expect("divide batch was not disjoint");
        wait_for_idle(&pipeline, "divide");

        let built = build_queued_meshes(&arena, &mesh);
        let reused = reactivate_cached_leaves(&arena, root);
        let (leaves, deepest) = tree_stats(&arena, root);
        info!(
            "approach cycle {cycle}: {} divides submitted in {}us, {built} meshes built, {reused} reused, {leaves} leaves, depth {deepest}",
            batch.len(),
            elapsed.as_micros()
        );
        if config.debug.show_stats {
            log_stats(&pipeline);
        }

        view = Viewpoint {
            x: view.x / 2,
            y: view.y / 2,
            z: view.z / 2,
        };
    }

    // Pull back and collapse the detail bottom-up until the far viewpoint is
    // satisfied with the root alone.
    view = Viewpoint {
        x: extent * 4,
        y: extent,
        z: extent * 2,
    };
    let mut retreat = 0u32;
    loop {
        let batch = collect_group_targets(&arena, root, view);
        if batch.is_empty() {
            break;
        }
        let elapsed = pipeline
            .submit(&batch)
            .expect("group batch was not disjoint");
        wait_for_idle(&pipeline, "group");

        retreat += 1;
        let (leaves, deepest) = tree_stats(&arena, root);
        info!(
            "retreat cycle {retreat}: {} groups submitted in {}us, {} slots pooled, {leaves} leaves, depth {deepest}",
            batch.len(),
            elapsed.as_micros(),
            node_pool.len()
        );
        if config.debug.show_stats {
            log_stats(&pipeline);
        }
    }

    // Approach once more: this divide pulls recycled slots out of the pool,
    // and their meshes skip the queue entirely.
    view = Viewpoint {
        x: half / 2,
        y: 0,
        z: 0,
    };
    let pooled_before = node_pool.len();
    let batch = collect_divide_targets(&arena, root, view, max_depth);
    pipeline
        .submit(&batch)
        .expect("divide batch was not disjoint");
    wait_for_idle(&pipeline, "divide");
    let built = build_queued_meshes(&arena, &mesh);
    let reused = reactivate_cached_leaves(&arena, root);
    info!(
        "revisit: {} divides, {} slots reused from the pool, {built} meshes built, {reused} leaves brought back without a rebuild",
        batch.len(),
        pooled_before - node_pool.len()
    );

    pipeline.shutdown();
    let stats = pipeline.stats();
    info!(
        "done: {} units submitted, {} divides, {} groups, {} violations, {} nodes resident, {} pooled",
        stats.submitted,
        stats.divides,
        stats.groups,
        stats.violations,
        arena.len(),
        node_pool.len()
    );
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .expect("Failed to resolve config directory")
            .join("horizon")
    });

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    // Initialize logging with config and debug settings
    let log_dir = config_dir.join("logs");
    horizon_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let cycles = args.cycles.unwrap_or(4);
    run_simulation(&config, cycles);
}
