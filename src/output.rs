//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: coloured status
//! lines, the progress spinner shown while entries are processed, and the
//! end-of-run summary table.

use crate::archiver::{FolderReport, RunResult};
use crate::journal::{Journal, LogEntry, Outcome};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use declutter::output::OutputFormatter;
    /// OutputFormatter::error("Cannot create archive folder");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints a warning to stderr, keeping stdout clean for machine output.
    pub fn warning_stderr(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a spinner for a run whose entry count is not known up front.
    pub fn create_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {pos} entries {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    /// Prints the per-folder summary table followed by the totals.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use declutter::archiver::RunResult;
    /// use declutter::output::OutputFormatter;
    ///
    /// OutputFormatter::summary_table(&RunResult::default());
    /// ```
    pub fn summary_table(result: &RunResult) {
        Self::header(if result.dry_run {
            "SUMMARY (dry run)"
        } else {
            "SUMMARY"
        });

        let width = result
            .folders
            .iter()
            .map(|f| f.label.len())
            .max()
            .unwrap_or(0)
            .max(6); // At least "Folder" width

        println!(
            "{:<width$} | {:>6} | {:>7} | {:>6} | {:>6}",
            "Folder".bold(),
            "Moved".bold(),
            "Skipped".bold(),
            "Failed".bold(),
            "Pruned".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 40));

        for folder in &result.folders {
            if !folder.available {
                println!(
                    "{:<width$} | {}",
                    folder.label,
                    "unavailable".yellow(),
                    width = width
                );
                continue;
            }
            println!(
                "{:<width$} | {:>6} | {:>7} | {:>6} | {:>6}",
                folder.label,
                folder.moved.to_string().green(),
                folder.skipped,
                Self::failed_cell(folder),
                folder.pruned,
                width = width
            );
        }

        println!("{}", "-".repeat(width + 40));
        println!(
            "{:<width$} | {:>6} | {:>7} | {:>6} | {:>6}",
            "Total".bold(),
            result.moved.to_string().green().bold(),
            result.skipped,
            result.failed,
            result.pruned,
            width = width
        );
        println!("Space cleared: {}", format_bytes(result.bytes_moved));
    }

    fn failed_cell(folder: &FolderReport) -> ColoredString {
        if folder.failed == 0 {
            folder.failed.to_string().normal()
        } else {
            folder.failed.to_string().red()
        }
    }
}

/// Formats a byte count for humans, e.g. `1.50 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Journal wrapper that ticks a progress spinner for each recorded entry.
pub struct ProgressJournal<J: Journal> {
    inner: J,
    progress: ProgressBar,
}

impl<J: Journal> ProgressJournal<J> {
    pub fn new(inner: J, progress: ProgressBar) -> Self {
        Self { inner, progress }
    }

    /// Stops the spinner and hands back the wrapped journal.
    pub fn finish(self) -> J {
        self.progress.finish_and_clear();
        self.inner
    }
}

impl<J: Journal> Journal for ProgressJournal<J> {
    fn record(&mut self, entry: &LogEntry) -> io::Result<()> {
        self.inner.record(entry)?;
        if entry.outcome != Outcome::Pruned {
            self.progress.inc(1);
        }
        if let Some(name) = entry.source.file_name() {
            self.progress
                .set_message(format!("{} {}", entry.outcome, name.to_string_lossy()));
        }
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        self.inner.location()
    }
}
