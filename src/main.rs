//! Tunesync - one-way incremental music sync to a phone
//!
//! Design goals:
//! - Never push a byte the device already has
//! - Lossless stays at home; the device gets opus
//! - One pass, no persisted state, safe to re-run any time

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use tunesync::config::SyncConfig;
use tunesync::engine::SyncEngine;
use tunesync::logger::{Logger, NoopLogger, TextLogger};
use tunesync::mount::{self, MountedDevice};
use tunesync::scan::FilterMode;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Tunesync - incremental one-way music sync to a phone with transcode-on-copy"
)]
struct Args {
    /// Report what would change without touching the device
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Sync the whole library instead of the per-device manifest
    #[arg(long)]
    full: bool,

    /// Local music library root (defaults to ~/Music)
    #[arg(long)]
    library: Option<PathBuf>,

    /// Also report entries that are already up to date
    #[arg(short, long)]
    verbose: bool,

    /// Write log entries to file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Set up Ctrl-C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // Exit immediately with 130 (128 + SIGINT)
        std::process::exit(130);
    })
    .expect("Error setting Ctrl-C handler");

    let args = Args::parse();

    // Choose logger once; zero overhead with NoopLogger
    let logger: Box<dyn Logger> = if let Some(ref p) = args.log_file {
        match TextLogger::new(p) {
            Ok(l) => Box::new(l),
            Err(_) => Box::new(NoopLogger),
        }
    } else {
        Box::new(NoopLogger)
    };

    let start = Instant::now();

    if args.dry_run {
        println!("DRY RUN MODE - No changes will be made");
    }

    let local_root = match args.library {
        Some(path) => path,
        None => dirs::home_dir()
            .context("cannot determine home directory")?
            .join("Music"),
    };

    let serial = mount::device_serial()?;
    println!("Selected {serial}");

    let device = MountedDevice::mount()?;

    let mut config = SyncConfig::new(local_root, device.path().to_path_buf());
    config.dry_run = args.dry_run;
    config.verbose = args.verbose;

    let filter = if args.full {
        FilterMode::Everything
    } else {
        FilterMode::from_manifest(&config.manifest_path(&serial), &config.local_root)?
    };

    logger.start(&config.local_root, &config.remote_root);
    let engine = SyncEngine::new(config, filter)?;
    let stats = engine.sync(logger.as_ref())?;

    // Print summary (always show)
    let elapsed = start.elapsed();
    logger.done(
        stats.deleted,
        stats.dirs_created,
        stats.files_synced,
        elapsed.as_secs_f64(),
    );
    println!();
    println!("=== Sync Complete ===");
    println!("Deleted: {}", stats.deleted);
    println!("Directories created: {}", stats.dirs_created);
    println!("Files synced: {}", stats.files_synced);
    println!("Time: {:.2}s", elapsed.as_secs_f64());

    Ok(())
}
