//! Worker thread logic for the parallel tree walk
//!
//! Each worker:
//! - Is bound to one page node's listing client
//! - Pulls folders from the shared work queue
//! - Pages through each folder until an empty page comes back
//! - Claims every entry in the visited set; only first claims are written
//! - Pushes claimed sub-folders back onto the work queue
//!
//! A stop request is honoured between pages, so a worker never runs more
//! than one listing call past it.
//!
//! Listing errors are not retried. They end the worker, and the coordinator
//! sees a thread that finished without reaching [`WorkerState::Stopped`].

use crate::error::WorkerError;
use crate::output::WriterHandle;
use crate::pages::types::FolderId;
use crate::pages::{PageNode, PagesClient};
use crate::walker::queue::WorkQueue;
use crate::walker::visited::VisitedSet;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for a folder
    Idle = 0,
    /// Inside a listing call
    Fetching = 1,
    /// Handling the entries of a page
    Processing = 2,
    /// Left the loop after a stop request
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Fetching,
            2 => WorkerState::Processing,
            _ => WorkerState::Stopped,
        }
    }
}

/// Counters owned by one worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerCounters {
    /// Entries written
    pub processed: u64,

    /// Folders fully listed
    pub folders: u64,

    /// Listing calls made (including the final empty page)
    pub pages: u64,

    /// Time spent inside listing calls
    pub rpc_time: Duration,
}

impl WorkerCounters {
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

/// State shared between a worker and the coordinator
#[derive(Debug)]
pub struct WorkerStatus {
    state: AtomicU8,
    stop: AtomicBool,
    counters: Mutex<WorkerCounters>,
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Idle as u8),
            stop: AtomicBool::new(false),
            counters: Mutex::new(WorkerCounters::default()),
        }
    }
}

impl WorkerStatus {
    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// True once the worker left its loop because it was asked to
    pub fn is_stopped(&self) -> bool {
        self.state() == WorkerState::Stopped
    }

    /// Ask the worker to stop at its next check
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Check whether a stop was requested
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Snapshot of the counters
    pub fn counters(&self) -> WorkerCounters {
        *self.counters.lock()
    }

    fn record_page(&self, elapsed: Duration) {
        let mut counters = self.counters.lock();
        counters.pages += 1;
        counters.rpc_time += elapsed;
    }

    fn record_entry(&self) {
        self.counters.lock().processed += 1;
    }

    fn record_folder(&self) {
        self.counters.lock().folders += 1;
    }
}

/// Shared structures every worker gets a reference to
#[derive(Clone)]
pub struct WorkerContext {
    /// Folders waiting to be listed
    pub queue: Arc<WorkQueue>,

    /// Identifiers already written
    pub visited: Arc<VisitedSet>,

    /// Output writer
    pub output: WriterHandle,
}

/// A worker thread that lists folders
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Name of the page node this worker lists through
    node: String,

    /// Thread handle
    handle: Option<JoinHandle<Result<(), WorkerError>>>,

    /// State shared with the coordinator
    status: Arc<WorkerStatus>,
}

impl Worker {
    /// Spawn a new worker thread bound to `node`
    pub fn spawn(id: usize, node: &PageNode, ctx: WorkerContext) -> Result<Self, WorkerError> {
        let status = Arc::new(WorkerStatus::default());
        let status_clone = Arc::clone(&status);
        let client = Arc::clone(&node.client);

        let handle = thread::Builder::new()
            .name(format!("walker-{}", id))
            .spawn(move || worker_loop(id, client.as_ref(), &ctx, &status_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            node: node.name.clone(),
            handle: Some(handle),
            status,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get the page node name
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Get the shared status
    pub fn status(&self) -> &WorkerStatus {
        &self.status
    }

    /// True once the thread has exited, for whatever reason
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Thread exited without a stop request being honoured
    pub fn has_crashed(&self) -> bool {
        self.is_finished() && !self.status.is_stopped()
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result,
                Err(payload) => Err(WorkerError::Panicked {
                    id: self.id,
                    message: panic_message(payload.as_ref()),
                }),
            }
        } else {
            Ok(())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Worker thread panicked".into()
    }
}

/// Main worker loop
pub(crate) fn worker_loop(
    id: usize,
    client: &dyn PagesClient,
    ctx: &WorkerContext,
    status: &WorkerStatus,
) -> Result<(), WorkerError> {
    debug!(worker = id, "Worker starting");

    loop {
        if status.stop_requested() {
            break;
        }

        status.set_state(WorkerState::Idle);
        let Some(folder) = ctx.queue.pop_blocking(&status.stop) else {
            break;
        };

        list_folder(id, folder, client, ctx, status)?;
    }

    status.set_state(WorkerState::Stopped);

    let counters = status.counters();
    debug!(
        worker = id,
        processed = counters.processed,
        folders = counters.folders,
        "Worker stopped"
    );

    Ok(())
}

/// Page through one folder, writing and queueing what it contains
fn list_folder(
    id: usize,
    folder: FolderId,
    client: &dyn PagesClient,
    ctx: &WorkerContext,
    status: &WorkerStatus,
) -> Result<(), WorkerError> {
    let mut cursor = String::new();

    loop {
        status.set_state(WorkerState::Fetching);
        let started = Instant::now();
        let page = client
            .list_page(folder, &cursor)
            .map_err(|source| WorkerError::Pages { id, source })?;
        status.record_page(started.elapsed());

        let Some(last) = page.last() else {
            break;
        };
        cursor = last.name.clone();

        status.set_state(WorkerState::Processing);
        trace!(worker = id, folder, entries = page.len(), "Processing page");

        for entry in page {
            if !ctx.visited.claim(entry.inode) {
                trace!(worker = id, inode = entry.inode, "Skipping duplicate entry");
                continue;
            }

            let inode = entry.inode;
            let is_dir = entry.is_dir;

            ctx.output
                .send_entry(entry)
                .map_err(|source| WorkerError::Output { id, source })?;
            status.record_entry();

            if is_dir {
                ctx.queue.push(inode);
            }
        }

        // Stop latency is one listing call, not one folder
        if status.stop_requested() {
            debug!(worker = id, folder, "Stop requested mid-folder");
            return Ok(());
        }
    }

    status.record_folder();
    Ok(())
}

/// Log a one-line summary for a worker that is about to be joined
pub(crate) fn log_final_counters(worker: &Worker) {
    let counters = worker.status().counters();
    info!(
        worker = worker.id(),
        node = %worker.node(),
        processed = counters.processed,
        folders = counters.folders,
        pages = counters.pages,
        rpc_secs = counters.rpc_time.as_secs_f64(),
        "Worker finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputWriter;
    use crate::pages::types::EntryRecord;
    use crate::pages::MemoryVdisk;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_worker_state_roundtrip() {
        let status = WorkerStatus::default();
        assert_eq!(status.state(), WorkerState::Idle);
        status.set_state(WorkerState::Fetching);
        assert_eq!(status.state(), WorkerState::Fetching);
        status.set_state(WorkerState::Stopped);
        assert!(status.is_stopped());
    }

    #[test]
    fn test_worker_counters() {
        let status = WorkerStatus::default();
        status.record_page(Duration::from_millis(500));
        status.record_page(Duration::from_millis(500));
        status.record_entry();
        status.record_entry();
        status.record_folder();

        let counters = status.counters();
        assert_eq!(counters.pages, 2);
        assert_eq!(counters.processed, 2);
        assert_eq!(counters.folders, 1);
        assert_eq!(counters.rpc_time, Duration::from_secs(1));
        assert!((counters.entries_per_rpc_second() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_list_folder_pages_and_pushes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let writer = OutputWriter::create(&path, 64).unwrap();

        let mut vdisk = MemoryVdisk::new(1).with_page_size(2);
        vdisk
            .add(1, EntryRecord::file(10, "a", 1))
            .add(1, EntryRecord::dir(11, "b"))
            .add(1, EntryRecord::file(12, "c", 1));

        let ctx = WorkerContext {
            queue: Arc::new(WorkQueue::new()),
            visited: Arc::new(VisitedSet::new()),
            output: writer.handle(),
        };
        let status = WorkerStatus::default();

        list_folder(0, 1, &vdisk, &ctx, &status).unwrap();

        assert_eq!(vdisk.cursors_for(1), ["", "b", "c"]);
        assert_eq!(ctx.queue.len(), 1);
        assert_eq!(ctx.queue.stats().pushed, 1);
        assert_eq!(status.counters().processed, 3);
        assert_eq!(status.counters().pages, 3);
        assert_eq!(status.counters().folders, 1);

        // Listing the same folder again writes nothing new
        list_folder(0, 1, &vdisk, &ctx, &status).unwrap();
        assert_eq!(status.counters().processed, 3);
        assert_eq!(ctx.queue.len(), 1);

        drop(ctx);
        assert_eq!(writer.finish().unwrap(), 3);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_stop_request_ends_folder_after_one_page() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::create(&dir.path().join("out.txt"), 64).unwrap();

        let mut vdisk = MemoryVdisk::new(1).with_page_size(2);
        for i in 0..10u64 {
            vdisk.add(1, EntryRecord::file(100 + i, format!("f{:02}", i), 0));
        }

        let ctx = WorkerContext {
            queue: Arc::new(WorkQueue::new()),
            visited: Arc::new(VisitedSet::new()),
            output: writer.handle(),
        };
        let status = WorkerStatus::default();
        status.request_stop();

        list_folder(0, 1, &vdisk, &ctx, &status).unwrap();

        assert_eq!(vdisk.cursors_for(1), [""]);
        assert_eq!(status.counters().processed, 2);
        assert_eq!(status.counters().folders, 0);
    }

    #[test]
    fn test_listing_error_ends_worker() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::create(&dir.path().join("out.txt"), 8).unwrap();
        let vdisk = MemoryVdisk::new(1).fail_on(1);

        let ctx = WorkerContext {
            queue: Arc::new(WorkQueue::new()),
            visited: Arc::new(VisitedSet::new()),
            output: writer.handle(),
        };
        ctx.queue.push(1);
        let status = WorkerStatus::default();

        let result = worker_loop(4, &vdisk, &ctx, &status);
        assert!(matches!(result, Err(WorkerError::Pages { id: 4, .. })));
        assert!(!status.is_stopped());
    }

    #[test]
    fn test_stop_request_ends_loop() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::create(&dir.path().join("out.txt"), 8).unwrap();
        let vdisk = MemoryVdisk::new(1);

        let ctx = WorkerContext {
            queue: Arc::new(WorkQueue::new()),
            visited: Arc::new(VisitedSet::new()),
            output: writer.handle(),
        };
        // Work is pending, but the stop request wins at loop top
        ctx.queue.push(1);
        let status = WorkerStatus::default();
        status.request_stop();

        worker_loop(0, &vdisk, &ctx, &status).unwrap();
        assert!(status.is_stopped());
        assert_eq!(ctx.queue.len(), 1);
        assert!(vdisk.calls().is_empty());
    }
}
