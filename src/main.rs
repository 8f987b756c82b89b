//! MediaIngest CLI - Parallel Media Import Pipeline
//!
//! Imports photos, raw captures, videos and sidecars from a source
//! directory into a content-addressed originals library.

use clap::Parser;
use mediaingest::config::{CliArgs, ImportJob};
use mediaingest::core::Importer;
use mediaingest::error::{IngestError, Result};
use mediaingest::progress::ProgressReporter;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = CliArgs::parse();

    // RUST_LOG overrides the level derived from -v / -q
    let default_level = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (_, 0) => "info",
        (_, 1) => "debug",
        (_, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let job = ImportJob::from_cli(&args).map_err(IngestError::Config)?;

    if args.verbose > 0 {
        print_job(&job);
    }

    let progress = if args.progress && !args.quiet {
        ProgressReporter::new()
    } else {
        ProgressReporter::disabled()
    };

    let importer = Importer::new(job).with_progress(progress);
    let summary = importer.start()?;

    if !args.quiet {
        summary.print_summary();
    }

    if !summary.is_clean() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_job(job: &ImportJob) {
    println!("=== Configuration ===");
    println!("Source:      {:?}", job.source);
    println!("Library:     {:?}", job.originals);
    println!("Mode:        {:?}", job.mode);
    println!("Workers:     {}", job.effective_workers());
    println!("Fingerprint: {}", job.fingerprint.name());
    println!("Overwrite:   {}", job.overwrite);
    println!("Sidecars:    {}", job.import_sidecars);
    println!("Convert:     {}", job.convert);
    println!();
}
