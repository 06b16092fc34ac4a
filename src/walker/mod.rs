//! Parallel tree walker
//!
//! Walks a vdisk folder by folder through the page nodes' listing call.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │     WalkCoordinator      │
//!                 │  - seeds root folder     │
//!                 │  - polls every tick      │
//!                 │  - crash / completion    │
//!                 └────────────┬─────────────┘
//!                              │
//!       ┌──────────────────────┼──────────────────────┐
//!       │                      │                      │
//! ┌─────▼─────┐          ┌─────▼─────┐          ┌─────▼─────┐
//! │  Worker 0 │          │  Worker 1 │          │  Worker N │
//! │  node A   │          │  node A   │          │  node M   │
//! └─────┬─────┘          └─────┬─────┘          └─────┬─────┘
//!       │  pop / push          │                      │
//!       └──────────────────────┼──────────────────────┘
//!                              ▼
//!     ┌────────────────┐  ┌──────────┐  ┌──────────────┐
//!     │   WorkQueue    │  │ Visited  │  │ OutputWriter │
//!     │ (one monitor)  │  │   Set    │  │   thread     │
//!     └────────────────┘  └──────────┘  └──────────────┘
//! ```

pub mod coordinator;
pub mod queue;
pub mod visited;
pub mod worker;

pub use coordinator::{WalkCoordinator, WalkProgress, WalkResult, WorkerSummary};
pub use queue::{QueueStats, WorkQueue};
pub use visited::VisitedSet;
pub use worker::{Worker, WorkerContext, WorkerCounters, WorkerState, WorkerStatus};
