//! pages-walker - Parallel vdisk tree printer
//!
//! Prints every entry of a vdisk's filesystem tree by walking it folder by
//! folder through the page nodes' paginated listing call. Each entry is
//! written exactly once, as one line of the output file.
//!
//! # Features
//!
//! - **Multi-node Listing**: Workers are spread over every page node, a
//!   fixed number per node, all pulling from one shared queue of folders.
//!
//! - **Exactly-once Output**: A shared visited set drops entries a listing
//!   returns twice, and terminates hard-linked directory cycles.
//!
//! - **Clean Completion**: The walk ends when the queue is empty and every
//!   worker is waiting, observed atomically. A worker that dies fails the
//!   whole walk.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Page Nodes                               │
//! │                 list_page(folder, cursor)                        │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Worker Threads                              │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐         ┌─────────┐     │
//! │  │Worker 1 │  │Worker 2 │  │Worker 3 │  ...    │Worker N │     │
//! │  │ node A  │  │ node A  │  │ node B  │         │ node M  │     │
//! │  └────┬────┘  └────┬────┘  └────┬────┘         └────┬────┘     │
//! │       └────────────┼────────────┼────────────────────┘          │
//! │                    ▼            ▼                               │
//! │            ┌──────────────────────────┐                         │
//! │            │  WorkQueue + VisitedSet  │                         │
//! │            └──────────────────────────┘                         │
//! │                         │                                       │
//! │                         ▼                                       │
//! │            ┌──────────────────────────┐                         │
//! │            │      OutputWriter        │                         │
//! │            └──────────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! pages-walker --vdisk_name vd01 --output_file vd01.tree
//! pages-walker --vdisk_name vd01 --output_file vd01.tree --page_nodes 3 --threads_per_page_node 16
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod pages;
pub mod progress;
pub mod walker;

pub use config::{CliArgs, WalkConfig};
pub use error::{Result, WalkerError};
pub use pages::{EntryRecord, LocalVdisk, MemoryVdisk, PageNode, PagesClient};
pub use walker::{WalkCoordinator, WalkResult};
