//! Thread pool with prioritized task lanes.
//!
//! Submitters enqueue boxed jobs into one of three lanes; worker threads
//! drain the most urgent lane that has work. Quitting closes the lanes and
//! joins every worker after the queues drain.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TryRecvError, select, unbounded};

use crate::task::{Job, TaskPriority};

/// Fixed-size pool of worker threads consuming prioritized jobs.
///
/// Lanes are drained in priority order whenever jobs are already queued; a
/// worker with nothing queued parks until any lane produces. All lanes are
/// unbounded, so submission never blocks.
pub struct WorkerPool {
    /// Lane senders, most urgent first. `None` once the pool has quit.
    lanes: Option<[Sender<Job>; 3]>,
    /// Handles to the worker threads (for shutdown).
    handles: Vec<JoinHandle<()>>,
    /// Jobs submitted but not yet finished.
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Creates a pool with `thread_count` workers (at least one).
    pub fn new(thread_count: usize) -> Self {
        let (high_tx, high_rx) = unbounded::<Job>();
        let (normal_tx, normal_rx) = unbounded::<Job>();
        let (low_tx, low_rx) = unbounded::<Job>();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let thread_count = thread_count.max(1);
        let mut handles = Vec::with_capacity(thread_count);
        for index in 0..thread_count {
            let lanes = [high_rx.clone(), normal_rx.clone(), low_rx.clone()];
            let in_flight = Arc::clone(&in_flight);

            let handle = std::thread::Builder::new()
                .name(format!("node-worker-{index}"))
                .spawn(move || run_worker(lanes, in_flight))
                .expect("Failed to spawn node worker thread");
            handles.push(handle);
        }

        Self {
            lanes: Some([high_tx, normal_tx, low_tx]),
            handles,
            in_flight,
        }
    }

    /// Creates a pool sized from the CPU count, leaving headroom for the
    /// main thread and render thread.
    pub fn with_defaults() -> Self {
        let cpus = num_cpus::get().max(2);
        Self::new((cpus - 2).max(1))
    }

    /// Submits a single job. Returns `false` if the pool has quit.
    pub fn add_task<F>(&self, priority: TaskPriority, work: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.send_job(priority, Box::new(work))
    }

    /// Submits a batch of jobs into one lane, preserving their order.
    ///
    /// Returns the number of jobs queued; short counts only happen when the
    /// pool quits mid-batch.
    pub fn add_task_batch<I>(&self, priority: TaskPriority, jobs: I) -> usize
    where
        I: IntoIterator<Item = Job>,
    {
        let mut queued = 0;
        for job in jobs {
            if !self.send_job(priority, job) {
                break;
            }
            queued += 1;
        }
        queued
    }

    fn send_job(&self, priority: TaskPriority, job: Job) -> bool {
        let lanes = match &self.lanes {
            Some(lanes) => lanes,
            None => return false,
        };
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        if lanes[priority.lane()].send(job).is_err() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Jobs submitted but not yet finished.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Number of worker threads still attached to the pool.
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Shuts the pool down after every queued job has run.
    ///
    /// Drops every lane sender to close the channels, then joins all
    /// workers. Safe to call more than once.
    pub fn quit(&mut self) {
        self.lanes.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.quit();
    }
}

fn run_worker(lanes: [Receiver<Job>; 3], in_flight: Arc<AtomicUsize>) {
    while let Some(job) = next_job(&lanes) {
        job();
        in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Takes the next job, preferring urgent lanes, or `None` once every lane is
/// closed and drained.
fn next_job(lanes: &[Receiver<Job>; 3]) -> Option<Job> {
    loop {
        let mut any_open = false;
        for lane in lanes {
            match lane.try_recv() {
                Ok(job) => return Some(job),
                Err(TryRecvError::Empty) => any_open = true,
                Err(TryRecvError::Disconnected) => {}
            }
        }
        if !any_open {
            return None;
        }

        // Park until any lane produces; the pass above restores lane order
        // on wakeup.
        select! {
            recv(lanes[0]) -> msg => if let Ok(job) = msg { return Some(job) },
            recv(lanes[1]) -> msg => if let Ok(job) = msg { return Some(job) },
            recv(lanes[2]) -> msg => if let Ok(job) = msg { return Some(job) },
        }
    }
}
