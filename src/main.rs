use anyhow::Context;
use clap::Parser;
use declutter::cli::{CliOutcome, RunOptions, run_cli};
use declutter::logging::init_logging;
use declutter::output::OutputFormatter;
use std::path::PathBuf;
use std::process::ExitCode;

/// Sweep Desktop and Downloads into dated archive folders.
#[derive(Parser, Debug)]
#[command(name = "declutter", version, about)]
struct Args {
    /// Configuration file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder to archive instead of Desktop and Downloads (repeatable)
    #[arg(short, long = "source")]
    sources: Vec<PathBuf>,

    /// Where to append the move log
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Start without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Show what would be moved without changing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn execute(args: Args) -> anyhow::Result<CliOutcome> {
    let options = RunOptions {
        config_path: args.config,
        sources: args.sources,
        log_file: args.log_file,
        dry_run: args.dry_run,
        assume_yes: args.yes,
        json: args.json,
    };

    run_cli(&options).context("archiving stopped before completion")
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.json {
        println!("declutter - sweep your Desktop and Downloads into dated archives");
    }

    match execute(args) {
        Ok(CliOutcome::Completed(_) | CliOutcome::Cancelled) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            OutputFormatter::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}
