//! Shared work queue of folders waiting to be listed
//!
//! One queue serves every worker on every page node. The queue and the
//! count of workers blocked on it live under a single monitor (mutex +
//! condition variable), so "queue empty and every worker idle" can be
//! observed atomically: a worker stops counting as idle in the same critical
//! section in which it takes a folder, and only becomes idle again once it
//! has pushed all the sub-folders that folder produced.

use crate::pages::types::FolderId;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Counters for the work queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Total folders pushed
    pub pushed: u64,

    /// Total folders handed to workers
    pub popped: u64,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Folders waiting to be listed (FIFO)
    pending: VecDeque<FolderId>,

    /// Workers currently blocked waiting for a folder
    idle: usize,

    stats: QueueStats,
}

/// Monitor-guarded queue of folders
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl WorkQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a folder and wake every waiting worker
    pub fn push(&self, folder: FolderId) {
        let mut state = self.state.lock();
        state.pending.push_back(folder);
        state.stats.pushed += 1;
        drop(state);
        self.available.notify_all();
    }

    /// Take the next folder, blocking while the queue is empty
    ///
    /// Returns `None` once `stop` is set and the queue is empty. The caller
    /// counts as idle for the whole time it is blocked here.
    pub fn pop_blocking(&self, stop: &AtomicBool) -> Option<FolderId> {
        let mut state = self.state.lock();
        state.idle += 1;

        loop {
            if let Some(folder) = state.pending.pop_front() {
                state.idle -= 1;
                state.stats.popped += 1;
                return Some(folder);
            }
            if stop.load(Ordering::SeqCst) {
                state.idle -= 1;
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Wake every blocked worker so it re-checks its stop flag
    ///
    /// Takes the lock first: a worker that has checked its flag but not yet
    /// started waiting cannot miss this wake-up.
    pub fn wake_all(&self) {
        let _state = self.state.lock();
        self.available.notify_all();
    }

    /// True when the queue is empty and all `workers` are blocked on it
    pub fn is_complete(&self, workers: usize) -> bool {
        let state = self.state.lock();
        state.pending.is_empty() && state.idle == workers
    }

    /// Number of workers currently blocked waiting for work
    pub fn idle_workers(&self) -> usize {
        self.state.lock().idle
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Get queue counters
    pub fn stats(&self) -> QueueStats {
        self.state.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        check()
    }

    #[test]
    fn test_queue_basic() {
        let queue = WorkQueue::new();
        let stop = AtomicBool::new(false);

        queue.push(2);
        queue.push(5);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop_blocking(&stop), Some(2));
        assert_eq!(queue.pop_blocking(&stop), Some(5));
        assert!(queue.is_empty());
        assert_eq!(queue.stats(), QueueStats { pushed: 2, popped: 2 });
    }

    #[test]
    fn test_stop_on_empty_queue() {
        let queue = WorkQueue::new();
        let stop = AtomicBool::new(true);
        assert_eq!(queue.pop_blocking(&stop), None);
        assert_eq!(queue.idle_workers(), 0);
    }

    #[test]
    fn test_stop_wakes_blocked_worker() {
        let queue = Arc::new(WorkQueue::new());
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            thread::spawn(move || queue.pop_blocking(&stop))
        };

        assert!(wait_until(Duration::from_secs(5), || queue.idle_workers() == 1));

        stop.store(true, Ordering::SeqCst);
        queue.wake_all();

        assert_eq!(worker.join().unwrap(), None);
        assert_eq!(queue.idle_workers(), 0);
    }

    #[test]
    fn test_push_wakes_blocked_worker() {
        let queue = Arc::new(WorkQueue::new());
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            thread::spawn(move || queue.pop_blocking(&stop))
        };

        assert!(wait_until(Duration::from_secs(5), || queue.idle_workers() == 1));
        queue.push(9);
        assert_eq!(worker.join().unwrap(), Some(9));
    }

    #[test]
    fn test_completion_not_signaled_while_worker_busy() {
        let queue = Arc::new(WorkQueue::new());
        let stop = Arc::new(AtomicBool::new(false));

        // Empty queue, but the one worker has never asked for work
        assert!(!queue.is_complete(1));

        // The worker takes the root: queue is empty again, worker is busy
        queue.push(2);
        assert_eq!(queue.pop_blocking(&stop), Some(2));
        assert!(queue.is_empty());
        assert!(!queue.is_complete(1));

        // It pushes a child before going idle: still not complete
        queue.push(3);
        assert!(!queue.is_complete(1));
        assert_eq!(queue.pop_blocking(&stop), Some(3));
        assert!(!queue.is_complete(1));

        // Finally it blocks for more work: now the walk is complete
        let worker = {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            thread::spawn(move || queue.pop_blocking(&stop))
        };
        assert!(wait_until(Duration::from_secs(5), || queue.is_complete(1)));

        stop.store(true, Ordering::SeqCst);
        queue.wake_all();
        assert_eq!(worker.join().unwrap(), None);
    }
}
