//! Walk coordinator - orchestrates the parallel tree walk
//!
//! The coordinator is responsible for:
//! - Spawning `threads` workers per page node, all sharing one queue,
//!   one visited set and one output writer
//! - Seeding the queue with the root folder
//! - Polling: per-worker throughput, crash detection, completion
//! - Orderly shutdown (stop flags, wake-up, joins, closing the output)
//!
//! A walk is complete when the queue is empty and every worker is blocked
//! waiting for work, observed in one critical section of the queue monitor.
//! A worker thread that exits without having been asked to stop is a crash:
//! every other worker is stopped and the walk fails.

use crate::config::{WalkConfig, MAX_THREADS_PER_NODE};
use crate::error::{ConfigError, OutputResult, Result, WorkerError};
use crate::output::OutputWriter;
use crate::pages::types::FolderId;
use crate::pages::PageNode;
use crate::progress::ProgressReporter;
use crate::walker::queue::WorkQueue;
use crate::walker::visited::VisitedSet;
use crate::walker::worker::{log_final_counters, Worker, WorkerContext, WorkerCounters};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Final numbers for one worker
#[derive(Debug, Clone)]
pub struct WorkerSummary {
    /// Worker ID
    pub id: usize,

    /// Page node the worker listed through
    pub node: String,

    /// Entries written
    pub processed: u64,

    /// Folders fully listed
    pub folders: u64,

    /// Listing calls made
    pub pages: u64,

    /// Time spent inside listing calls
    pub rpc_time: Duration,
}

impl WorkerSummary {
    fn new(worker: &Worker, counters: WorkerCounters) -> Self {
        Self {
            id: worker.id(),
            node: worker.node().to_string(),
            processed: counters.processed,
            folders: counters.folders,
            pages: counters.pages,
            rpc_time: counters.rpc_time,
        }
    }

    /// Entries written per second of listing time
    pub fn entries_per_rpc_second(&self) -> f64 {
        let secs = self.rpc_time.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Result of a walk that ran to an orderly stop
#[derive(Debug)]
pub struct WalkResult {
    /// When the walk started
    pub started_at: DateTime<Utc>,

    /// Time taken for the walk
    pub duration: Duration,

    /// Lines written to the output
    pub entries_written: u64,

    /// Folders fully listed
    pub folders_listed: u64,

    /// Listing calls made
    pub pages_fetched: u64,

    /// Time spent in listing calls, summed over workers
    pub rpc_time: Duration,

    /// Whether the walk completed (vs was interrupted)
    pub completed: bool,

    /// Workers that failed to join cleanly
    pub join_failures: usize,

    /// Per-worker numbers
    pub workers: Vec<WorkerSummary>,
}

impl WalkResult {
    /// Entries written per wall-clock second
    pub fn entries_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.entries_written as f64 / secs
        } else {
            0.0
        }
    }
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct WalkProgress {
    /// Entries written
    pub entries: u64,

    /// Folders fully listed
    pub folders: u64,

    /// Current queue size
    pub queue_size: usize,

    /// Workers blocked waiting for work
    pub idle_workers: usize,

    /// Total workers
    pub total_workers: usize,

    /// Elapsed time
    pub elapsed: Duration,
}

impl WalkProgress {
    /// Calculate entries per second rate
    pub fn entries_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.entries as f64 / secs
        } else {
            0.0
        }
    }
}

/// How the monitor loop ended
enum Outcome {
    Complete,
    Interrupted,
    Crashed { id: usize, node: String },
}

/// Outcome of stopping the pool
struct StopReport {
    output: OutputResult<u64>,
    summaries: Vec<WorkerSummary>,
    failures: Vec<WorkerError>,
}

/// Coordinates the parallel tree walk
pub struct WalkCoordinator {
    /// Page nodes to spawn workers for
    nodes: Vec<PageNode>,

    /// Folder the walk starts from
    root: FolderId,

    /// Monitor tick
    poll_interval: Duration,

    /// Work queue shared by all workers
    queue: Arc<WorkQueue>,

    /// Identifiers already written
    visited: Arc<VisitedSet>,

    /// Output writer, taken when the output is closed
    writer: Option<OutputWriter>,

    /// Shared structures handed to every worker
    ctx: WorkerContext,

    /// Worker threads
    workers: Vec<Worker>,

    /// Shutdown signal (Ctrl-C)
    shutdown: Arc<AtomicBool>,

    /// Optional progress display
    progress: Option<ProgressReporter>,
}

impl WalkCoordinator {
    /// Create a coordinator for `nodes`, opening the output file
    pub fn new(config: &WalkConfig, nodes: Vec<PageNode>) -> Result<Self> {
        let first = nodes.first().ok_or(ConfigError::NoPageNodes)?;
        let root = first.client.root_folder();
        if let Some(node) = nodes.iter().find(|n| n.threads == 0 || n.threads > MAX_THREADS_PER_NODE) {
            return Err(ConfigError::InvalidThreadCount {
                count: node.threads,
                max: MAX_THREADS_PER_NODE,
            }
            .into());
        }
        let writer = OutputWriter::create(&config.output_path, config.output_buffer)?;
        let queue = Arc::new(WorkQueue::new());
        let visited = Arc::new(VisitedSet::new());
        let ctx = WorkerContext {
            queue: Arc::clone(&queue),
            visited: Arc::clone(&visited),
            output: writer.handle(),
        };

        Ok(Self {
            nodes,
            root,
            poll_interval: config.poll_interval,
            queue,
            visited,
            writer: Some(writer),
            ctx,
            workers: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            progress: None,
        })
    }

    /// Start from `root` instead of the first node's root folder
    pub fn with_root(mut self, root: FolderId) -> Self {
        self.root = root;
        self
    }

    /// Update `progress` on every monitor tick
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Total workers across all nodes
    pub fn total_workers(&self) -> usize {
        self.nodes.iter().map(|n| n.threads).sum()
    }

    /// Run the walk to completion, interruption or crash
    pub fn run(mut self) -> Result<WalkResult> {
        let start_time = Instant::now();
        let started_at: DateTime<Utc> = Utc::now();

        info!(
            nodes = self.nodes.len(),
            workers = self.total_workers(),
            root = self.root,
            started_at = %started_at.to_rfc3339(),
            "Starting tree walk"
        );

        if let Err(e) = self.spawn_workers() {
            error!(error = %e, "Failed to start workers");
            let report = self.stop();
            log_join_failures(&report.failures);
            return Err(e.into());
        }

        // An entry linking back to the root is skipped like any other duplicate
        self.visited.claim(self.root);
        // Workers are already waiting; seeding wakes one of them
        self.queue.push(self.root);

        let outcome = self.monitor(start_time);
        let report = self.stop();
        let duration = start_time.elapsed();
        let completed = matches!(outcome, Outcome::Complete);

        if let Some(progress) = &self.progress {
            match outcome {
                Outcome::Complete => progress.finish("Walk completed"),
                Outcome::Interrupted => progress.finish("Walk interrupted"),
                Outcome::Crashed { .. } => progress.finish_and_clear(),
            }
        }

        if let Outcome::Crashed { id, node } = outcome {
            let reason = crash_reason(id, &report.failures);
            log_join_failures(report.failures.iter().filter(|e| !is_from_worker(e, id)));
            return Err(WorkerError::Crashed { id, node, reason }.into());
        }

        log_join_failures(&report.failures);

        let mut result = WalkResult {
            started_at,
            duration,
            entries_written: report.output?,
            folders_listed: 0,
            pages_fetched: 0,
            rpc_time: Duration::ZERO,
            completed,
            join_failures: report.failures.len(),
            workers: report.summaries,
        };
        for w in &result.workers {
            result.folders_listed += w.folders;
            result.pages_fetched += w.pages;
            result.rpc_time += w.rpc_time;
        }

        info!(
            entries = result.entries_written,
            folders = result.folders_listed,
            pages = result.pages_fetched,
            completed = result.completed,
            duration_secs = duration.as_secs_f64(),
            visited = self.visited.len(),
            "Walk finished"
        );

        Ok(result)
    }

    /// Spawn worker threads, `threads` per page node
    fn spawn_workers(&mut self) -> std::result::Result<(), WorkerError> {
        let mut id = 0;
        for node in &self.nodes {
            for _ in 0..node.threads {
                let worker = Worker::spawn(id, node, self.ctx.clone())?;
                self.workers.push(worker);
                id += 1;
            }
            debug!(node = %node.name, threads = node.threads, "Workers spawned for node");
        }

        info!(count = self.workers.len(), "Workers spawned");
        Ok(())
    }

    /// Poll until the walk completes, is interrupted or a worker crashes
    fn monitor(&self, start_time: Instant) -> Outcome {
        let total = self.workers.len();

        loop {
            thread::sleep(self.poll_interval);

            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown signal received");
                return Outcome::Interrupted;
            }

            let mut entries = 0;
            let mut folders = 0;
            for worker in &self.workers {
                let counters = worker.status().counters();
                entries += counters.processed;
                folders += counters.folders;
                debug!(
                    worker = worker.id(),
                    node = %worker.node(),
                    state = ?worker.status().state(),
                    processed = counters.processed,
                    rpc_secs = counters.rpc_time.as_secs_f64(),
                    rate = counters.entries_per_rpc_second(),
                    "Worker progress"
                );
            }

            if let Some(crashed) = self.workers.iter().find(|w| w.has_crashed()) {
                error!(
                    worker = crashed.id(),
                    node = %crashed.node(),
                    "Worker exited without a stop request"
                );
                return Outcome::Crashed {
                    id: crashed.id(),
                    node: crashed.node().to_string(),
                };
            }

            let progress = WalkProgress {
                entries,
                folders,
                queue_size: self.queue.len(),
                idle_workers: self.queue.idle_workers(),
                total_workers: total,
                elapsed: start_time.elapsed(),
            };
            debug!(
                entries = progress.entries,
                queue = progress.queue_size,
                idle = progress.idle_workers,
                rate = progress.entries_per_second(),
                "Walk progress"
            );
            if let Some(reporter) = &self.progress {
                reporter.update(&progress);
            }

            if let Err(e) = self.ctx.output.flush() {
                debug!(error = %e, "Output flush not delivered");
            }

            if self.queue.is_complete(total) {
                return Outcome::Complete;
            }
        }
    }

    /// Stop every worker, join them all, then close the output
    fn stop(&mut self) -> StopReport {
        for worker in &self.workers {
            worker.status().request_stop();
        }
        self.queue.wake_all();

        let mut summaries = Vec::with_capacity(self.workers.len());
        let mut failures = Vec::new();

        for worker in std::mem::take(&mut self.workers) {
            log_final_counters(&worker);
            let summary = WorkerSummary::new(&worker, worker.status().counters());
            if let Err(e) = worker.join() {
                failures.push(e);
            }
            summaries.push(summary);
        }

        // All workers are joined, nothing else can be sent
        let output = match self.writer.take() {
            Some(writer) => writer.finish(),
            None => Ok(0),
        };
        if let Err(e) = &output {
            error!(error = %e, "Failed to close output");
        }

        StopReport {
            output,
            summaries,
            failures,
        }
    }
}

fn is_from_worker(err: &WorkerError, id: usize) -> bool {
    match err {
        WorkerError::SpawnFailed { id: i, .. }
        | WorkerError::Panicked { id: i, .. }
        | WorkerError::Pages { id: i, .. }
        | WorkerError::Output { id: i, .. }
        | WorkerError::Crashed { id: i, .. } => *i == id,
    }
}

fn crash_reason(id: usize, failures: &[WorkerError]) -> String {
    failures
        .iter()
        .find(|e| is_from_worker(e, id))
        .map(|e| e.to_string())
        .unwrap_or_else(|| "exited without a stop request".into())
}

fn log_join_failures<'a>(failures: impl IntoIterator<Item = &'a WorkerError>) {
    for e in failures {
        warn!(error = %e, "Worker failed to join cleanly");
    }
}
