//! Command-line orchestration for declutter.
//!
//! This module handles everything between argument parsing and the archiver:
//! - Configuration loading with fallback to defaults
//! - Source folder resolution
//! - The confirmation prompt
//! - Opening the move journal
//! - Reporting the run summary

use crate::archiver::{Archiver, RunResult};
use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, ArchiveResult};
use crate::fs_ops::RealFileSystem;
use crate::journal::{FileJournal, Journal, MemoryJournal};
use crate::output::{OutputFormatter, ProgressJournal};
use crate::source::{FolderLocator, SourceFolder};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Options collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
    /// Source folders replacing the configured/default ones.
    pub sources: Vec<PathBuf>,
    /// Journal location override.
    pub log_file: Option<PathBuf>,
    /// Report only; nothing is moved.
    pub dry_run: bool,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
    /// Print the result as JSON instead of the table.
    pub json: bool,
}

/// How a CLI invocation ended.
#[derive(Debug)]
pub enum CliOutcome {
    /// The run finished; per-entry failures may still be present.
    Completed(RunResult),
    /// The user declined the confirmation prompt.
    Cancelled,
}

/// Runs the CLI against the real environment, reading confirmation from stdin.
///
/// # Examples
///
/// ```no_run
/// use declutter::cli::{run_cli, CliOutcome, RunOptions};
///
/// match run_cli(&RunOptions::default()) {
///     Ok(CliOutcome::Completed(result)) => println!("moved {}", result.moved),
///     Ok(CliOutcome::Cancelled) => println!("nothing done"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(options: &RunOptions) -> ArchiveResult<CliOutcome> {
    let stdin = io::stdin();
    let locator = FolderLocator::from_environment();
    run_cli_with(options, &mut stdin.lock(), locator.as_ref())
}

/// Runs the CLI with an injected input stream and folder locator.
///
/// # Errors
///
/// Returns [`ArchiveError::FatalIo`] when no source can be determined, the
/// journal cannot be opened, or the archiver aborts.
pub fn run_cli_with(
    options: &RunOptions,
    input: &mut dyn BufRead,
    locator: Option<&FolderLocator>,
) -> ArchiveResult<CliOutcome> {
    // With --json, stdout carries only the result document.
    let warn = |message: &str| {
        if options.json {
            OutputFormatter::warning_stderr(message);
        } else {
            OutputFormatter::warning(message);
        }
    };

    let loaded = ArchiveConfig::load_or_default(options.config_path.as_deref());
    if let Some(e) = &loaded.fallback {
        warn(&format!("{}; using built-in defaults", e));
    }
    let config = loaded.config;

    let sources = resolve_sources(options, &config, locator)?;

    if !options.json {
        if options.dry_run {
            OutputFormatter::dry_run_notice("Nothing will be moved.");
        }
        OutputFormatter::info(&format!(
            "Entries will be moved into '{}' folders inside:",
            config.archive_folder_name
        ));
        for source in &sources {
            println!(" - {}: {}", source.label, source.path.display());
        }
    }

    if !options.assume_yes && !options.dry_run {
        let confirmed = if options.json {
            confirm(input, &mut io::stderr())?
        } else {
            confirm(input, &mut io::stdout())?
        };
        if !confirmed {
            warn("Cancelled, nothing was moved.");
            return Ok(CliOutcome::Cancelled);
        }
    }

    let log_path = options
        .log_file
        .clone()
        .or_else(|| config.log_file.clone())
        .or_else(FileJournal::default_path)
        .ok_or_else(|| ArchiveError::FatalIo {
            context: "cannot determine log file location",
            path: PathBuf::new(),
            source: io::Error::new(io::ErrorKind::NotFound, "no local data directory"),
        })?;

    let archiver = Archiver::new(RealFileSystem, config)?
        .dry_run(options.dry_run)
        .protect(&log_path);

    let result = if options.dry_run {
        archiver.run(&sources, &mut MemoryJournal::new())?
    } else {
        let journal = FileJournal::open(&log_path).map_err(|e| ArchiveError::FatalIo {
            context: "cannot open log file",
            path: log_path.clone(),
            source: e,
        })?;
        tracing::info!("Appending to log file {}", journal.path().display());
        if options.json {
            run_with_journal(&archiver, &sources, journal)?
        } else {
            let mut journal = ProgressJournal::new(journal, OutputFormatter::create_spinner());
            let result = archiver.run(&sources, &mut journal);
            journal.finish();
            result?
        }
    };

    report(&result, options.json, &log_path);
    Ok(CliOutcome::Completed(result))
}

fn run_with_journal(
    archiver: &Archiver<RealFileSystem>,
    sources: &[SourceFolder],
    mut journal: impl Journal,
) -> ArchiveResult<RunResult> {
    archiver.run(sources, &mut journal)
}

/// Picks the source folders: CLI paths, then configured paths, then the
/// resolved Desktop and Downloads.
fn resolve_sources(
    options: &RunOptions,
    config: &ArchiveConfig,
    locator: Option<&FolderLocator>,
) -> ArchiveResult<Vec<SourceFolder>> {
    if !options.sources.is_empty() {
        return Ok(options.sources.iter().map(SourceFolder::from_path).collect());
    }
    if !config.source_folders.is_empty() {
        return Ok(config
            .source_folders
            .iter()
            .map(SourceFolder::from_path)
            .collect());
    }

    let locator = locator.ok_or_else(|| ArchiveError::FatalIo {
        context: "cannot determine home directory",
        path: PathBuf::new(),
        source: io::Error::new(io::ErrorKind::NotFound, "no home directory"),
    })?;
    Ok(locator.resolve_all(&RealFileSystem))
}

/// Asks for a keypress before anything is moved.
///
/// The prompt goes to `prompt`. Enter (or any other answer) continues; `n`,
/// `no`, `q`, `quit` or end of input cancel.
pub fn confirm(input: &mut dyn BufRead, prompt: &mut dyn Write) -> ArchiveResult<bool> {
    let _ = write!(prompt, "Press Enter to start archiving, or type 'n' to cancel: ");
    let _ = prompt.flush();

    let mut answer = String::new();
    let read = input
        .read_line(&mut answer)
        .map_err(|e| ArchiveError::FatalIo {
            context: "cannot read confirmation",
            path: PathBuf::from("<stdin>"),
            source: e,
        })?;
    if read == 0 {
        let _ = writeln!(prompt);
        return Ok(false);
    }

    let answer = answer.trim().to_lowercase();
    Ok(!matches!(answer.as_str(), "n" | "no" | "q" | "quit"))
}

fn report(result: &RunResult, json: bool, log_path: &std::path::Path) {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(text) => println!("{}", text),
            Err(e) => OutputFormatter::error(&format!("Cannot serialize result: {}", e)),
        }
        return;
    }

    for folder in result.unavailable() {
        OutputFormatter::warning(&format!(
            "{} is not available ({}), skipped.",
            folder.label,
            folder.source.display()
        ));
    }
    for (folder, batch) in result
        .folders
        .iter()
        .filter_map(|f| f.batch.as_ref().map(|b| (f, b)))
    {
        OutputFormatter::success(&format!(
            "{}: {} moved into {}",
            folder.label,
            folder.moved,
            batch.display()
        ));
    }

    OutputFormatter::summary_table(result);

    if result.dry_run {
        OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
    } else if result.failed > 0 {
        OutputFormatter::warning(&format!(
            "Some entries could not be archived. Details in {}",
            log_path.display()
        ));
    } else {
        OutputFormatter::success(&format!("Done. Log written to {}", log_path.display()));
    }
}
