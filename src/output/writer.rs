//! Output file writer
//!
//! Workers never touch the output file. They send entries to a dedicated
//! writer thread over a bounded channel; the thread renders one line per
//! entry into a buffered file.
//!
//! Closing the writer ([`OutputWriter::finish`]) drains every entry sent
//! before the call, flushes, and reports how many lines were written.

use crate::error::{OutputError, OutputResult};
use crate::pages::types::EntryRecord;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Default capacity of the writer channel
pub const DEFAULT_CHANNEL_SIZE: usize = 10_000;

/// Message types sent to the writer thread
#[derive(Debug)]
pub enum WriterMessage {
    /// Append one entry line
    Entry(EntryRecord),

    /// Flush buffered lines to the file
    Flush,

    /// Stop after everything queued before this message
    Shutdown,
}

/// Statistics about write operations
#[derive(Debug, Default)]
pub struct WriterStats {
    /// Lines written
    pub lines_written: AtomicU64,
}

impl WriterStats {
    /// Get the number of lines written so far
    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }
}

/// Handle for sending entries to the writer (clone one per worker)
#[derive(Clone)]
pub struct WriterHandle {
    sender: Sender<WriterMessage>,
    stats: Arc<WriterStats>,
}

impl WriterHandle {
    /// Send an entry to be written
    pub fn send_entry(&self, entry: EntryRecord) -> OutputResult<()> {
        self.sender
            .send(WriterMessage::Entry(entry))
            .map_err(|_| OutputError::ChannelClosed)
    }

    /// Request a flush of buffered lines
    ///
    /// The coordinator sends one per tick so the file tracks the walk.
    pub fn flush(&self) -> OutputResult<()> {
        self.sender
            .send(WriterMessage::Flush)
            .map_err(|_| OutputError::ChannelClosed)
    }

    /// Get writer statistics
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }
}

/// Line writer that runs in its own thread
pub struct OutputWriter {
    /// Thread handle
    handle: Option<JoinHandle<OutputResult<()>>>,

    /// Handle used for shutdown and cloned for workers
    writer_handle: WriterHandle,

    /// Output file path
    path: PathBuf,
}

impl OutputWriter {
    /// Create (truncate) the output file and start the writer thread
    pub fn create(path: &Path, channel_size: usize) -> OutputResult<Self> {
        let file = File::create(path).map_err(|e| OutputError::CreateFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let (sender, receiver) = bounded(channel_size.max(1));
        let stats = Arc::new(WriterStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("output-writer".into())
            .spawn(move || writer_thread(BufWriter::new(file), receiver, stats_clone))
            .map_err(|e| OutputError::CreateFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to spawn writer thread: {}", e),
            })?;

        debug!(path = %path.display(), "Output writer started");

        Ok(Self {
            handle: Some(handle),
            writer_handle: WriterHandle { sender, stats },
            path: path.to_path_buf(),
        })
    }

    /// Get a handle for sending entries to the writer
    pub fn handle(&self) -> WriterHandle {
        self.writer_handle.clone()
    }

    /// Close the output: drain queued entries, flush, join the thread
    ///
    /// Returns the number of lines written.
    pub fn finish(mut self) -> OutputResult<u64> {
        // The thread may already be gone after a write error; its result
        // below carries the real cause.
        let _ = self.writer_handle.sender.send(WriterMessage::Shutdown);

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => return Err(OutputError::WriterPanicked),
            }
        }

        let lines = self.writer_handle.stats.lines_written();
        debug!(path = %self.path.display(), lines, "Output writer finished");
        Ok(lines)
    }
}

/// Writer thread main loop
fn writer_thread<W: Write>(
    mut out: W,
    receiver: Receiver<WriterMessage>,
    stats: Arc<WriterStats>,
) -> OutputResult<()> {
    let result = drain_messages(&mut out, &receiver, &stats);
    if let Err(e) = &result {
        error!(error = %e, "Output writer failed");
    }
    result
}

fn drain_messages<W: Write>(
    out: &mut W,
    receiver: &Receiver<WriterMessage>,
    stats: &WriterStats,
) -> OutputResult<()> {
    // recv fails once every handle is dropped; treat that as shutdown
    while let Ok(message) = receiver.recv() {
        match message {
            WriterMessage::Entry(entry) => {
                writeln!(out, "{}", entry)?;
                stats.lines_written.fetch_add(1, Ordering::Relaxed);
            }
            WriterMessage::Flush => {
                out.flush()?;
            }
            WriterMessage::Shutdown => break,
        }
    }
    out.flush()?;
    Ok(())
}
