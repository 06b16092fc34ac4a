//! Error types for pages-walker
//!
//! This module defines the error hierarchy for a walk:
//! - Listing failures reported by a page node
//! - Output file errors
//! - Configuration and CLI errors
//! - Worker thread errors (including crash detection)
//!
//! Library code uses thiserror; only the binary reaches for anyhow.

use crate::pages::types::FolderId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a walk
#[derive(Error, Debug)]
pub enum WalkerError {
    /// Listing service errors
    #[error("Pages error: {0}")]
    Pages(#[from] PagesError),

    /// Output file errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Errors raised by a page node's listing call
#[derive(Error, Debug, Clone)]
pub enum PagesError {
    /// The vdisk root could not be opened
    #[error("Vdisk not found at '{path}': {reason}")]
    VdiskNotFound { path: PathBuf, reason: String },

    /// The folder identifier is unknown to the node
    #[error("Folder {folder} is not known to this page node")]
    FolderNotFound { folder: FolderId },

    /// The listing call itself failed
    #[error("Failed to list folder {folder} after '{cursor}': {reason}")]
    ListFailed {
        folder: FolderId,
        cursor: String,
        reason: String,
    },
}

/// Output file errors
#[derive(Error, Debug)]
pub enum OutputError {
    /// Failed to create the output file or writer thread
    #[error("Failed to create output at '{path}': {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// A write to the output failed
    #[error("Write failed: {0}")]
    Write(#[from] std::io::Error),

    /// Writer channel closed (the writer thread has exited)
    #[error("Output writer channel closed unexpectedly")]
    ChannelClosed,

    /// Writer thread panicked
    #[error("Output writer thread panicked")]
    WriterPanicked,
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid vdisk name
    #[error("Invalid vdisk name '{name}': {reason}")]
    InvalidVdiskName { name: String, reason: String },

    /// Invalid worker count per node
    #[error("Invalid thread count {count}: must be between 1 and {max}")]
    InvalidThreadCount { count: usize, max: usize },

    /// Invalid page node count
    #[error("Invalid page node count {count}: must be between 1 and {max}")]
    InvalidPageNodes { count: usize, max: usize },

    /// Invalid listing page size
    #[error("Invalid page size {size}: must be between 1 and {max}")]
    InvalidPageSize { size: usize, max: usize },

    /// Poll interval too small
    #[error("Invalid poll interval {millis}ms: must be at least {min}ms")]
    InvalidPollInterval { millis: u64, min: u64 },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Nothing to run the walk on
    #[error("No page nodes available for the walk")]
    NoPageNodes,
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The OS refused to spawn the worker thread
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Listing call failed inside a worker (not retried)
    #[error("Worker {id} listing error: {source}")]
    Pages { id: usize, source: PagesError },

    /// Worker could not hand an entry to the output writer
    #[error("Worker {id} output error: {source}")]
    Output { id: usize, source: OutputError },

    /// Worker thread ended without a graceful stop
    #[error("Worker {id} on {node} crashed: {reason}")]
    Crashed {
        id: usize,
        node: String,
        reason: String,
    },
}

/// Result type alias for WalkerError
pub type Result<T> = std::result::Result<T, WalkerError>;

/// Result type alias for PagesError
pub type PagesResult<T> = std::result::Result<T, PagesError>;

/// Result type alias for OutputError
pub type OutputResult<T> = std::result::Result<T, OutputError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let pages_err = PagesError::FolderNotFound { folder: 42 };
        let walker_err: WalkerError = pages_err.into();
        assert!(matches!(walker_err, WalkerError::Pages(_)));

        let worker_err = WorkerError::Crashed {
            id: 3,
            node: "pages-1".into(),
            reason: "boom".into(),
        };
        let walker_err: WalkerError = worker_err.into();
        assert!(matches!(walker_err, WalkerError::Worker(WorkerError::Crashed { id: 3, .. })));
    }

    #[test]
    fn test_error_messages() {
        let err = PagesError::ListFailed {
            folder: 7,
            cursor: "b.txt".into(),
            reason: "connection reset".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to list folder 7 after 'b.txt': connection reset"
        );

        let err = WorkerError::Pages {
            id: 1,
            source: PagesError::FolderNotFound { folder: 9 },
        };
        assert!(err.to_string().contains("Folder 9"));
    }
}
