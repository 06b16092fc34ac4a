//! Progress reporting for the tree walker
//!
//! Provides a live spinner on stderr plus the header and summary printed
//! around a walk.

use crate::walker::{WalkProgress, WalkResult};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter that displays walk status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &WalkProgress) {
        let busy = progress.total_workers.saturating_sub(progress.idle_workers);
        let msg = format!(
            "Entries: {} | Folders: {} | Rate: {:.0}/s | Queue: {} | Busy: {}/{}",
            format_number(progress.entries),
            format_number(progress.folders),
            progress.entries_per_second(),
            format_number(progress.queue_size as u64),
            busy,
            progress.total_workers,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the walk
pub fn print_header(vdisk: &str, nodes: usize, workers: usize, output: &Path) {
    println!();
    println!(
        "{} {}",
        style("pages-walker").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Vdisk:").bold(), vdisk);
    println!("  {} {}", style("Page nodes:").bold(), nodes);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Output:").bold(), output.display());
    println!();
}

/// Print a summary of the walk results
pub fn print_summary(result: &WalkResult, output: &Path) {
    let title = if result.completed {
        style("Walk Complete").green().bold()
    } else {
        style("Walk Interrupted").yellow().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Entries:").bold(),
        format_number(result.entries_written)
    );
    println!(
        "  {} {}",
        style("Folders:").bold(),
        format_number(result.folders_listed)
    );
    println!(
        "  {} {}",
        style("Pages:").bold(),
        format_number(result.pages_fetched)
    );
    println!(
        "  {} {:.1}s ({:.0} entries/sec)",
        style("Duration:").bold(),
        result.duration.as_secs_f64(),
        result.entries_per_second()
    );
    println!(
        "  {} {:.1}s",
        style("Listing time:").bold(),
        result.rpc_time.as_secs_f64()
    );
    if result.join_failures > 0 {
        println!(
            "  {} {}",
            style("Join failures:").yellow().bold(),
            result.join_failures
        );
    }
    println!("  {} {}", style("Output:").bold(), output.display());
    println!();
}
