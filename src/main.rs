//! pages-walker - Parallel vdisk tree printer
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use pages_walker::config::{CliArgs, WalkConfig};
use pages_walker::pages::{LocalVdisk, PageNode, PagesClient};
use pages_walker::progress::{print_header, print_summary, ProgressReporter};
use pages_walker::walker::WalkCoordinator;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run the walk, returning whether it completed
fn run() -> Result<bool> {
    let args = CliArgs::parse();

    setup_logging(args.debug);

    let config = WalkConfig::from_args(args).context("Invalid configuration")?;

    let vdisk = LocalVdisk::open_in(&config.mount_root, &config.vdisk_name, config.page_size)
        .with_context(|| format!("Failed to open vdisk '{}'", config.vdisk_name))?;
    info!(vdisk = %config.vdisk_name, root = %vdisk.root().display(), "Vdisk opened");

    let client: Arc<dyn PagesClient> = Arc::new(vdisk);
    let nodes = PageNode::cluster(client, config.page_nodes, config.threads_per_node);

    let coordinator =
        WalkCoordinator::new(&config, nodes).context("Failed to initialize walker")?;

    if config.show_progress {
        print_header(
            &config.vdisk_name,
            config.page_nodes,
            coordinator.total_workers(),
            &config.output_path,
        );
    }

    // Setup signal handler for graceful shutdown
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let coordinator = if config.show_progress {
        let progress = ProgressReporter::new();
        progress.set_status("Listing root folder...");
        coordinator.with_progress(progress)
    } else {
        coordinator
    };

    let result = coordinator.run().context("Walk failed")?;

    if config.show_progress {
        print_summary(&result, &config.output_path);
    }

    if !result.completed {
        info!("Walk was interrupted before completion");
    }

    Ok(result.completed)
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("pages_walker=debug,warn")
    } else {
        EnvFilter::new("pages_walker=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
