//! Set of entry identifiers already written
//!
//! A listing can return the same entry more than once (pages shifting under
//! concurrent changes, a directory hard-linked in two places). The first
//! worker to claim an identifier owns it: that worker writes the line and,
//! for a directory, queues it. Everyone else skips the entry.

use crate::pages::types::FolderId;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Thread-safe set of seen identifiers
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: Mutex<HashSet<FolderId>>,
}

impl VisitedSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`, returning true only for the first caller
    ///
    /// Check and insert happen under one lock, so of any number of
    /// concurrent callers exactly one gets `true`.
    pub fn claim(&self, id: FolderId) -> bool {
        self.seen.lock().insert(id)
    }

    /// Number of identifiers seen
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Check if nothing has been seen yet
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_claim_once() {
        let visited = VisitedSet::new();
        assert!(visited.is_empty());
        assert!(visited.claim(7));
        assert!(!visited.claim(7));
        assert!(visited.claim(8));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_concurrent_claims() {
        let visited = Arc::new(VisitedSet::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let visited = Arc::clone(&visited);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    for id in 0..1000 {
                        if visited.claim(id) {
                            winners.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::Relaxed), 1000);
        assert_eq!(visited.len(), 1000);
    }
}
