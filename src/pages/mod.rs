//! Page node access
//!
//! A vdisk is served by one or more page nodes. Each node exposes a
//! paginated "list folder" call: given a folder and a resume cursor (the name
//! of the last entry seen), it returns the next page of entries in name
//! order, or an empty page when the folder is exhausted.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐         ┌──────────────┐
//! │  PageNode 0  │  │  PageNode 1  │   ...   │  PageNode M  │
//! │  N threads   │  │  N threads   │         │  N threads   │
//! └──────┬───────┘  └──────┬───────┘         └──────┬───────┘
//!        │                 │                        │
//!        └─────────────────┼────────────────────────┘
//!                          ▼
//!              ┌──────────────────────┐
//!              │  dyn PagesClient     │
//!              │  list_page(id, cur)  │
//!              └──────────────────────┘
//! ```
//!
//! Two backends ship with the crate: [`LocalVdisk`] lists a vdisk mounted on
//! the local filesystem, and [`MemoryVdisk`] serves a scripted tree for tests
//! and benchmarks.

pub mod local;
pub mod memory;
pub mod types;

pub use local::LocalVdisk;
pub use memory::MemoryVdisk;
pub use types::{EntryRecord, FolderId, ROOT_FOLDER_ID};

use crate::error::PagesResult;
use std::fmt;
use std::sync::Arc;

/// Default connection pool size of a page node client
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Client for a page node's listing service
pub trait PagesClient: Send + Sync {
    /// List the page of `folder` that follows `cursor`
    ///
    /// `cursor` is empty for the first page and the name of the last entry
    /// of the previous page afterwards. An empty page means the folder has
    /// no more entries.
    fn list_page(&self, folder: FolderId, cursor: &str) -> PagesResult<Vec<EntryRecord>>;

    /// Identifier of the folder the walk starts from
    fn root_folder(&self) -> FolderId {
        ROOT_FOLDER_ID
    }

    /// Number of concurrent calls this client is sized for
    fn pool_size(&self) -> usize {
        DEFAULT_POOL_SIZE
    }
}

/// A page node taking part in the walk
#[derive(Clone)]
pub struct PageNode {
    /// Node name (used in logs and worker summaries)
    pub name: String,

    /// Listing client for this node
    pub client: Arc<dyn PagesClient>,

    /// Number of worker threads to run against this node
    pub threads: usize,
}

impl PageNode {
    /// Create a node with an explicit thread count
    pub fn new(name: impl Into<String>, client: Arc<dyn PagesClient>, threads: usize) -> Self {
        Self {
            name: name.into(),
            client,
            threads,
        }
    }

    /// Build `count` nodes that all front the same vdisk
    ///
    /// Each node runs `threads` workers, or as many as the client's pool
    /// size when no override is given.
    pub fn cluster(
        client: Arc<dyn PagesClient>,
        count: usize,
        threads: Option<usize>,
    ) -> Vec<PageNode> {
        let threads = threads.unwrap_or_else(|| client.pool_size());
        (0..count)
            .map(|i| PageNode::new(format!("pages-{}", i), Arc::clone(&client), threads))
            .collect()
    }
}

impl fmt::Debug for PageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageNode")
            .field("name", &self.name)
            .field("threads", &self.threads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_default_threads() {
        let vdisk: Arc<dyn PagesClient> = Arc::new(MemoryVdisk::new(1));
        let nodes = PageNode::cluster(vdisk, 3, None);

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].name, "pages-0");
        assert_eq!(nodes[2].name, "pages-2");
        assert!(nodes.iter().all(|n| n.threads == DEFAULT_POOL_SIZE));
    }

    #[test]
    fn test_cluster_thread_override() {
        let vdisk: Arc<dyn PagesClient> = Arc::new(MemoryVdisk::new(1));
        let nodes = PageNode::cluster(vdisk, 2, Some(5));
        assert!(nodes.iter().all(|n| n.threads == 5));
    }
}
