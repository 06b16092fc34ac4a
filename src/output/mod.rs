//! Output of the walk
//!
//! One line per unique entry, written by a single writer thread:
//!
//! ```text
//! ┌───────────────────────────────────┐
//! │         Worker Threads (N)        │
//! │  - send EntryRecord via channel   │
//! └─────────────────┬─────────────────┘
//!                   │ WriterMessage
//!                   ▼
//! ┌───────────────────────────────────┐
//! │       OutputWriter Thread         │
//! │  - renders lines                  │
//! │  - BufWriter<File>                │
//! └───────────────────────────────────┘
//! ```
//!
//! Line order follows arrival order and is not stable across runs.

pub mod writer;

pub use writer::{OutputWriter, WriterHandle, WriterMessage, WriterStats, DEFAULT_CHANNEL_SIZE};
