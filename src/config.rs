//! Configuration types for pages-walker
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//!
//! Flag names keep their underscore spelling (`--vdisk_name`), matching the
//! scripts that already call the tool.

use crate::error::ConfigError;
use crate::output::DEFAULT_CHANNEL_SIZE;
use clap::Parser;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

/// Maximum worker threads per page node
pub const MAX_THREADS_PER_NODE: usize = 256;

/// Maximum number of page nodes
const MAX_PAGE_NODES: usize = 64;

/// Default entries per listing page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Maximum entries per listing page
const MAX_PAGE_SIZE: usize = 100_000;

/// Default coordinator tick
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Minimum coordinator tick
const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Where vdisks are mounted unless told otherwise
pub const DEFAULT_MOUNT_ROOT: &str = "/mnt/vdisks";

/// Valid vdisk names
static VDISK_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("Invalid vdisk name regex")
});

/// Print every entry of a vdisk's filesystem tree
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pages-walker",
    version,
    about = "Print every entry of a vdisk's filesystem tree",
    long_about = "Walks a vdisk through its page nodes' paginated listing call and writes one line \
                  per entry to the output file.\n\n\
                  Workers on every page node share one queue of folders; each entry is written \
                  exactly once.",
    after_help = "EXAMPLES:\n    \
        pages-walker --vdisk_name vd01 --output_file vd01.tree\n    \
        pages-walker --vdisk_name vd01 --output_file vd01.tree --threads_per_page_node 16 --page_nodes 3\n    \
        pages-walker --vdisk_name vd01 --output_file vd01.tree --mount_root /mnt/pages --quiet"
)]
pub struct CliArgs {
    /// Name of the vdisk to walk
    #[arg(long = "vdisk_name", value_name = "NAME")]
    pub vdisk_name: String,

    /// File to write the tree to (one line per entry)
    #[arg(long = "output_file", value_name = "FILE")]
    pub output_file: PathBuf,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,

    /// Quiet mode - suppress progress output
    #[arg(long)]
    pub quiet: bool,

    /// Worker threads per page node (default: the node's pool size)
    #[arg(long = "threads_per_page_node", value_name = "NUM")]
    pub threads_per_page_node: Option<usize>,

    /// Directory the vdisks are mounted under
    #[arg(long = "mount_root", default_value = DEFAULT_MOUNT_ROOT, value_name = "DIR")]
    pub mount_root: PathBuf,

    /// Number of page nodes to list through
    #[arg(long = "page_nodes", default_value_t = 1, value_name = "NUM")]
    pub page_nodes: usize,

    /// Entries requested per listing page
    #[arg(long = "page_size", default_value_t = DEFAULT_PAGE_SIZE, value_name = "NUM")]
    pub page_size: usize,

    /// Progress poll interval in milliseconds
    #[arg(long = "poll_interval_ms", default_value_t = DEFAULT_POLL_INTERVAL_MS, value_name = "MS")]
    pub poll_interval_ms: u64,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Vdisk name
    pub vdisk_name: String,

    /// Directory the vdisks are mounted under
    pub mount_root: PathBuf,

    /// Output file path
    pub output_path: PathBuf,

    /// Number of page nodes
    pub page_nodes: usize,

    /// Workers per node; `None` means the node's pool size
    pub threads_per_node: Option<usize>,

    /// Entries per listing page
    pub page_size: usize,

    /// Coordinator tick
    pub poll_interval: Duration,

    /// Output writer channel capacity
    pub output_buffer: usize,

    /// Show header, spinner and summary
    pub show_progress: bool,

    /// Verbose logging
    pub debug: bool,
}

impl WalkConfig {
    /// Configuration with defaults for everything but the vdisk and output
    pub fn new(vdisk_name: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            vdisk_name: vdisk_name.into(),
            mount_root: PathBuf::from(DEFAULT_MOUNT_ROOT),
            output_path: output_path.into(),
            page_nodes: 1,
            threads_per_node: None,
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            output_buffer: DEFAULT_CHANNEL_SIZE,
            show_progress: false,
            debug: false,
        }
    }

    /// Override the coordinator tick
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        validate_vdisk_name(&args.vdisk_name)?;

        if let Some(count) = args.threads_per_page_node {
            if count == 0 || count > MAX_THREADS_PER_NODE {
                return Err(ConfigError::InvalidThreadCount {
                    count,
                    max: MAX_THREADS_PER_NODE,
                });
            }
        }

        if args.page_nodes == 0 || args.page_nodes > MAX_PAGE_NODES {
            return Err(ConfigError::InvalidPageNodes {
                count: args.page_nodes,
                max: MAX_PAGE_NODES,
            });
        }

        if args.page_size == 0 || args.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize {
                size: args.page_size,
                max: MAX_PAGE_SIZE,
            });
        }

        if args.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::InvalidPollInterval {
                millis: args.poll_interval_ms,
                min: MIN_POLL_INTERVAL_MS,
            });
        }

        if args.output_file.as_os_str().is_empty() || args.output_file.is_dir() {
            return Err(ConfigError::InvalidOutputPath {
                path: args.output_file.clone(),
                reason: "Expected a file path".to_string(),
            });
        }

        if let Some(parent) = args.output_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidOutputPath {
                    path: args.output_file.clone(),
                    reason: format!("Parent directory '{}' does not exist", parent.display()),
                });
            }
        }

        Ok(Self {
            vdisk_name: args.vdisk_name,
            mount_root: args.mount_root,
            output_path: args.output_file,
            page_nodes: args.page_nodes,
            threads_per_node: args.threads_per_page_node,
            page_size: args.page_size,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            output_buffer: DEFAULT_CHANNEL_SIZE,
            show_progress: !args.quiet,
            debug: args.debug,
        })
    }

    /// Mount point of the configured vdisk
    pub fn vdisk_path(&self) -> PathBuf {
        self.mount_root.join(&self.vdisk_name)
    }
}

fn validate_vdisk_name(name: &str) -> Result<(), ConfigError> {
    if VDISK_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidVdiskName {
            name: name.to_string(),
            reason: "expected letters, digits, '.', '_' or '-'".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let mut argv = vec!["pages-walker"];
        argv.extend_from_slice(args);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_required_flags() {
        assert!(CliArgs::try_parse_from(["pages-walker"]).is_err());
        assert!(CliArgs::try_parse_from(["pages-walker", "--vdisk_name", "vd"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--vdisk_name", "vd01", "--output_file", "out.txt"]);
        assert!(!args.debug);
        assert!(!args.quiet);
        assert_eq!(args.threads_per_page_node, None);
        assert_eq!(args.page_nodes, 1);
        assert_eq!(args.page_size, DEFAULT_PAGE_SIZE);

        let config = WalkConfig::from_args(args).unwrap();
        assert!(config.show_progress);
        assert_eq!(config.poll_interval, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
        assert_eq!(config.vdisk_path(), PathBuf::from(DEFAULT_MOUNT_ROOT).join("vd01"));
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--vdisk_name",
            "vd01",
            "--output_file",
            "out.txt",
            "--threads_per_page_node",
            "16",
            "--quiet",
            "--debug",
            "--page_nodes",
            "3",
        ]);
        let config = WalkConfig::from_args(args).unwrap();
        assert_eq!(config.threads_per_node, Some(16));
        assert_eq!(config.page_nodes, 3);
        assert!(!config.show_progress);
        assert!(config.debug);
    }

    #[test]
    fn test_invalid_values() {
        let base = ["--vdisk_name", "vd01", "--output_file", "out.txt"];

        let mut args = parse(&base);
        args.threads_per_page_node = Some(0);
        assert!(matches!(
            WalkConfig::from_args(args),
            Err(ConfigError::InvalidThreadCount { count: 0, .. })
        ));

        let mut args = parse(&base);
        args.page_size = 0;
        assert!(matches!(
            WalkConfig::from_args(args),
            Err(ConfigError::InvalidPageSize { .. })
        ));

        let mut args = parse(&base);
        args.poll_interval_ms = 1;
        assert!(matches!(
            WalkConfig::from_args(args),
            Err(ConfigError::InvalidPollInterval { .. })
        ));

        let mut args = parse(&base);
        args.output_file = PathBuf::from("/definitely/not/here/out.txt");
        assert!(matches!(
            WalkConfig::from_args(args),
            Err(ConfigError::InvalidOutputPath { .. })
        ));
    }

    #[test]
    fn test_vdisk_names() {
        assert!(validate_vdisk_name("vd01").is_ok());
        assert!(validate_vdisk_name("backup_pool.v2-a").is_ok());
        assert!(validate_vdisk_name("").is_err());
        assert!(validate_vdisk_name("../etc").is_err());
        assert!(validate_vdisk_name("a/b").is_err());
        assert!(validate_vdisk_name(".hidden").is_err());
    }
}
