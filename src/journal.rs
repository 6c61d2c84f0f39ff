//! Append-only record of every attempted entry.
//!
//! Each [`LogEntry`] becomes one tab-separated line:
//!
//! ```text
//! <timestamp>\t<source_path>\t<destination_path_or_empty>\t<outcome>[\t<reason>]
//! ```
//!
//! Lines are only ever appended; nothing here rewrites or truncates the file.

use crate::error::{ArchiveError, ArchiveResult};
use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// What happened to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Moved into a batch folder.
    Moved,
    /// Left in place because an exclusion rule matched.
    Skipped,
    /// The move or removal was attempted and failed.
    Failed,
    /// An expired batch folder was removed.
    Pruned,
}

impl Outcome {
    /// The token written to the log file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Moved => "moved",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
            Outcome::Pruned => "pruned",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempted operation and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub outcome: Outcome,
    pub reason: Option<String>,
}

impl LogEntry {
    pub fn moved(timestamp: DateTime<Local>, source: PathBuf, destination: PathBuf) -> Self {
        Self {
            timestamp,
            source,
            destination: Some(destination),
            outcome: Outcome::Moved,
            reason: None,
        }
    }

    pub fn skipped(timestamp: DateTime<Local>, source: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            timestamp,
            source,
            destination: None,
            outcome: Outcome::Skipped,
            reason: Some(reason.into()),
        }
    }

    pub fn failed(
        timestamp: DateTime<Local>,
        source: PathBuf,
        destination: Option<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            source,
            destination,
            outcome: Outcome::Failed,
            reason: Some(reason.into()),
        }
    }

    pub fn pruned(timestamp: DateTime<Local>, batch: PathBuf) -> Self {
        Self {
            timestamp,
            source: batch,
            destination: None,
            outcome: Outcome::Pruned,
            reason: None,
        }
    }

    /// Renders the entry as a single log line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{}\t{}\t{}\t{}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            sanitize(&self.source.to_string_lossy()),
            self.destination
                .as_deref()
                .map(|p| sanitize(&p.to_string_lossy()))
                .unwrap_or_default(),
            self.outcome,
        );
        if let Some(reason) = self.reason.as_deref().filter(|r| !r.is_empty()) {
            line.push('\t');
            line.push_str(&sanitize(reason));
        }
        line
    }
}

fn sanitize(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

/// Sink for [`LogEntry`] records.
pub trait Journal {
    /// Appends one entry.
    fn record(&mut self, entry: &LogEntry) -> io::Result<()>;

    /// Where entries end up, for journals backed by a file.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Appends `entry`, turning a write failure into a run-stopping error that
/// names the journal's location.
pub(crate) fn record_or_fatal(journal: &mut dyn Journal, entry: &LogEntry) -> ArchiveResult<()> {
    journal.record(entry).map_err(|e| ArchiveError::FatalIo {
        context: "cannot write log entry",
        path: journal
            .location()
            .map_or_else(|| PathBuf::from("<journal>"), Path::to_path_buf),
        source: e,
    })
}

/// Appends entries to a log file on disk.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    file: File,
}

impl FileJournal {
    /// Opens `path` for appending, creating it and its parent folders.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// The log file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Default location: `<local data dir>/declutter/declutter.log`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("declutter").join("declutter.log"))
    }
}

impl Journal for FileJournal {
    fn record(&mut self, entry: &LogEntry) -> io::Result<()> {
        writeln!(self.file, "{}", entry.to_line())?;
        self.file.flush()
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Keeps entries in memory; used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    pub entries: Vec<LogEntry>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries with the given outcome.
    pub fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.outcome == outcome)
    }
}

impl Journal for MemoryJournal {
    fn record(&mut self, entry: &LogEntry) -> io::Result<()> {
        self.entries.push(entry.clone());
        Ok(())
    }
}

impl<J: Journal + ?Sized> Journal for &mut J {
    fn record(&mut self, entry: &LogEntry) -> io::Result<()> {
        (**self).record(entry)
    }

    fn location(&self) -> Option<&Path> {
        (**self).location()
    }
}
