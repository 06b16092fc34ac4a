//! In-memory vdisk
//!
//! Serves a scripted folder tree through [`PagesClient`]. Used by the test
//! suite and the benchmarks to drive the walker without a mounted vdisk.
//! Besides plain listing it can:
//! - fail every listing of chosen folders
//! - repeat the previous page's last entry at the start of each new page
//! - sleep before answering to simulate RPC latency
//!
//! Every call is recorded so tests can check the exact cursor sequence.

use crate::error::{PagesError, PagesResult};
use crate::pages::types::{EntryRecord, FolderId};
use crate::pages::PagesClient;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

/// Default number of entries per page
const DEFAULT_PAGE_SIZE: usize = 1000;

/// An in-memory folder tree served page by page
#[derive(Debug)]
pub struct MemoryVdisk {
    root: FolderId,
    folders: HashMap<FolderId, Vec<EntryRecord>>,
    page_size: usize,
    overlap: bool,
    latency: Option<Duration>,
    failing: HashSet<FolderId>,
    calls: Mutex<Vec<(FolderId, String)>>,
}

impl MemoryVdisk {
    /// Create an empty vdisk whose root folder is `root`
    pub fn new(root: FolderId) -> Self {
        let mut folders = HashMap::new();
        folders.insert(root, Vec::new());
        Self {
            root,
            folders,
            page_size: DEFAULT_PAGE_SIZE,
            overlap: false,
            latency: None,
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the number of entries per page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Repeat the previous page's last entry at the start of every later page
    pub fn with_overlapping_pages(mut self) -> Self {
        self.overlap = true;
        self
    }

    /// Sleep for `latency` before answering each call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every listing of `folder` fail
    pub fn fail_on(mut self, folder: FolderId) -> Self {
        self.failing.insert(folder);
        self
    }

    /// Add `entry` to `parent`
    ///
    /// Directory entries get an (empty) folder of their own if they do not
    /// have one yet, so they can be listed.
    pub fn add(&mut self, parent: FolderId, entry: EntryRecord) -> &mut Self {
        if entry.is_dir {
            self.folders.entry(entry.inode).or_default();
        }
        let entries = self.folders.entry(parent).or_default();
        let pos = entries.partition_point(|e| e.name < entry.name);
        entries.insert(pos, entry);
        self
    }

    /// Build a balanced tree under the root
    ///
    /// Every folder down to `depth` holds `dirs` sub-folders and `files`
    /// files. Returns the total number of entries below the root.
    pub fn balanced(root: FolderId, depth: u32, dirs: usize, files: usize) -> (Self, usize) {
        let mut vdisk = Self::new(root);
        let mut next_inode = root + 1;
        let mut total = 0;
        let mut level = vec![root];

        for d in 0..depth {
            let mut next_level = Vec::new();
            for &parent in &level {
                for i in 0..files {
                    vdisk.add(parent, EntryRecord::file(next_inode, format!("file-{:04}", i), i as u64));
                    next_inode += 1;
                    total += 1;
                }
                if d + 1 < depth {
                    for i in 0..dirs {
                        vdisk.add(parent, EntryRecord::dir(next_inode, format!("dir-{:04}", i)));
                        next_level.push(next_inode);
                        next_inode += 1;
                        total += 1;
                    }
                }
            }
            level = next_level;
        }

        (vdisk, total)
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<(FolderId, String)> {
        self.calls.lock().clone()
    }

    /// Cursors used for `folder`, in order
    pub fn cursors_for(&self, folder: FolderId) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(f, _)| *f == folder)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Number of entries stored below the root
    pub fn entry_count(&self) -> usize {
        self.folders.values().map(Vec::len).sum()
    }
}

impl PagesClient for MemoryVdisk {
    fn list_page(&self, folder: FolderId, cursor: &str) -> PagesResult<Vec<EntryRecord>> {
        self.calls.lock().push((folder, cursor.to_string()));

        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }

        if self.failing.contains(&folder) {
            return Err(PagesError::ListFailed {
                folder,
                cursor: cursor.to_string(),
                reason: "injected failure".into(),
            });
        }

        let entries = self
            .folders
            .get(&folder)
            .ok_or(PagesError::FolderNotFound { folder })?;

        let start = entries.partition_point(|e| e.name.as_str() <= cursor);
        let end = (start + self.page_size).min(entries.len());
        let mut page = entries[start..end].to_vec();

        if self.overlap && start > 0 && !page.is_empty() {
            page.insert(0, entries[start - 1].clone());
        }

        Ok(page)
    }

    fn root_folder(&self) -> FolderId {
        self.root
    }
}
