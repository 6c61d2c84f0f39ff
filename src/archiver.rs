//! The archiving run.
//!
//! For each source folder the archiver lists the direct children, skips
//! excluded entries, and renames everything else into a batch folder named
//! after the run's start time:
//!
//! ```text
//! <source>/Archive/<Mon-DD-YYYY_HH-MMAM>/<original names>
//! ```
//!
//! The batch folder (and the archive folder above it) is only created once
//! the first qualifying entry is found. Per-entry failures are recorded and
//! the run moves on; only failing to create the destination or to write the
//! journal stops the run.

use crate::batch::{batch_name, claim_batch_dir, unique_destination};
use crate::config::{ArchiveConfig, ConfigError, ExclusionRules};
use crate::error::{ArchiveError, ArchiveResult};
use crate::fs_ops::{EntryInfo, FileSystem, RealFileSystem};
use crate::journal::{Journal, LogEntry, record_or_fatal};
use crate::prune::{PrunePolicy, prune_archive};
use crate::source::SourceFolder;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

/// Extensions treated as shortcuts when `shortcuts_folder_name` is set.
pub const SHORTCUT_EXTENSIONS: &[&str] = &["lnk", "url", "desktop", "webloc"];

/// Per-source outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderReport {
    pub label: String,
    pub source: PathBuf,
    /// The batch folder created for this source, if any entry qualified.
    pub batch: Option<PathBuf>,
    /// False when the source folder was missing or unreadable.
    pub available: bool,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pruned: usize,
    pub bytes_moved: u64,
}

impl FolderReport {
    fn new(source: &SourceFolder) -> Self {
        Self {
            label: source.label.clone(),
            source: source.path.clone(),
            available: true,
            ..Self::default()
        }
    }

    fn unavailable(source: &SourceFolder) -> Self {
        Self {
            available: false,
            ..Self::new(source)
        }
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pruned: usize,
    pub bytes_moved: u64,
    pub dry_run: bool,
    pub folders: Vec<FolderReport>,
}

impl RunResult {
    fn absorb(&mut self, folder: FolderReport) {
        self.moved += folder.moved;
        self.skipped += folder.skipped;
        self.failed += folder.failed;
        self.pruned += folder.pruned;
        self.bytes_moved += folder.bytes_moved;
        self.folders.push(folder);
    }

    /// Source folders that could not be processed.
    pub fn unavailable(&self) -> impl Iterator<Item = &FolderReport> {
        self.folders.iter().filter(|f| !f.available)
    }
}

/// Moves qualifying entries of source folders into dated batch folders.
pub struct Archiver<F: FileSystem> {
    fs: F,
    config: ArchiveConfig,
    rules: ExclusionRules,
    now: Option<DateTime<Local>>,
    dry_run: bool,
    protected: Vec<PathBuf>,
}

impl<F: FileSystem> Archiver<F> {
    /// Creates an archiver for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the validation error if the configuration is unusable.
    pub fn new(fs: F, config: ArchiveConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = config.rules()?;
        Ok(Self {
            fs,
            config,
            rules,
            now: None,
            dry_run: false,
            protected: Vec::new(),
        })
    }

    /// Fixes the run's start time instead of reading the clock.
    pub fn with_clock(mut self, now: DateTime<Local>) -> Self {
        self.now = Some(now);
        self
    }

    /// Report what would happen without touching the filesystem or journal.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Never move `path`, e.g. the journal file when it sits in a source folder.
    pub fn protect(mut self, path: impl Into<PathBuf>) -> Self {
        self.protected.push(path.into());
        self
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Archives every source folder in order.
    ///
    /// Unavailable folders are reported and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::FatalIo`] when an archive folder cannot be
    /// created or the journal cannot be written. Entries already moved stay
    /// moved.
    pub fn run(
        &self,
        sources: &[SourceFolder],
        journal: &mut dyn Journal,
    ) -> ArchiveResult<RunResult> {
        let now = self.now.unwrap_or_else(Local::now);
        let batch = batch_name(&now);
        let mut result = RunResult {
            dry_run: self.dry_run,
            ..RunResult::default()
        };

        for source in sources {
            tracing::info!("Archiving {} ({})", source.label, source.path.display());
            match self.archive_folder(source, &batch, now, journal) {
                Ok(report) => result.absorb(report),
                Err(e @ ArchiveError::SourceUnavailable { .. }) => {
                    tracing::warn!("Skipping {}: {}", source.label, e);
                    result.absorb(FolderReport::unavailable(source));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(result)
    }

    fn archive_folder(
        &self,
        source: &SourceFolder,
        batch: &str,
        now: DateTime<Local>,
        journal: &mut dyn Journal,
    ) -> ArchiveResult<FolderReport> {
        if !self.fs.is_dir(&source.path) {
            return Err(ArchiveError::SourceUnavailable {
                path: source.path.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "folder does not exist"),
            });
        }
        let entries =
            self.fs
                .list_dir(&source.path)
                .map_err(|e| ArchiveError::SourceUnavailable {
                    path: source.path.clone(),
                    source: e,
                })?;

        let archive_root = source.path.join(&self.config.archive_folder_name);
        let archive_entry = self.archive_entry(&entries, &archive_root);
        let mut report = FolderReport::new(source);
        let mut batch_dir: Option<PathBuf> = None;

        for entry in entries {
            if archive_entry.as_deref() == Some(entry.file_name.as_os_str()) {
                continue;
            }

            let skip_reason = if self.is_protected(&entry.path) {
                Some("log file".to_string())
            } else {
                self.rules.check(&entry.name).map(|rule| rule.to_string())
            };
            if let Some(reason) = skip_reason {
                tracing::debug!("Skipping {}: {}", entry.path.display(), reason);
                report.skipped += 1;
                self.record(journal, LogEntry::skipped(Local::now(), entry.path, reason))?;
                continue;
            }

            let dir = match &batch_dir {
                Some(dir) => dir.clone(),
                None => {
                    let dir = self.open_batch(&archive_root, batch)?;
                    batch_dir = Some(dir.clone());
                    dir
                }
            };

            let record = match self.move_entry(&entry, &dir) {
                Ok(destination) => {
                    report.moved += 1;
                    report.bytes_moved += entry.len;
                    LogEntry::moved(Local::now(), entry.path, destination)
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.failed += 1;
                    let (destination, reason) = match e {
                        ArchiveError::Move { to, source, .. } => (Some(to), source.to_string()),
                        other => (None, other.to_string()),
                    };
                    LogEntry::failed(Local::now(), entry.path, destination, reason)
                }
            };
            self.record(journal, record)?;
        }

        if self.config.prunes() {
            let policy = PrunePolicy {
                max_age_days: self.config.max_archive_age_days,
                now,
                keep: batch_dir.as_deref(),
                dry_run: self.dry_run,
            };
            let pruned = prune_archive(&self.fs, &archive_root, &policy, journal)?;
            report.pruned = pruned.removed.len();
            report.failed += pruned.failed.len();
        }

        report.batch = batch_dir;
        Ok(report)
    }

    /// The listed entry that is the archive folder, if any.
    ///
    /// An exact name match wins. A case variant such as `archive` only counts
    /// when the filesystem itself resolves the configured name to it, i.e. on
    /// case-insensitive volumes.
    fn archive_entry(&self, entries: &[EntryInfo], archive_root: &Path) -> Option<OsString> {
        let configured = OsStr::new(&self.config.archive_folder_name);
        if entries.iter().any(|e| e.file_name.as_os_str() == configured) {
            return Some(configured.to_os_string());
        }
        if !self.fs.exists(archive_root) {
            return None;
        }
        let wanted = self.config.archive_folder_name.to_lowercase();
        entries
            .iter()
            .find(|e| e.name.to_lowercase() == wanted)
            .map(|e| e.file_name.clone())
    }

    /// Whether `path` names a protected file, however either path is spelled.
    fn is_protected(&self, path: &Path) -> bool {
        if self.protected.iter().any(|p| p == path) {
            return true;
        }
        if self.protected.is_empty() {
            return false;
        }
        let Some(resolved) = self.resolve(path) else {
            return false;
        };
        self.protected
            .iter()
            .any(|p| self.resolve(p).is_some_and(|p| p == resolved))
    }

    /// Canonical form of `path`, or of its parent for a file not created yet.
    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        self.fs.canonicalize(path).ok().or_else(|| {
            let name = path.file_name()?;
            let parent = self.fs.canonicalize(path.parent()?).ok()?;
            Some(parent.join(name))
        })
    }

    /// Ensures the archive folder exists and claims this run's batch folder.
    fn open_batch(&self, archive_root: &Path, batch: &str) -> ArchiveResult<PathBuf> {
        if self.dry_run {
            return Ok(unique_destination(&self.fs, archive_root, OsStr::new(batch)));
        }

        self.fs
            .create_dir_all(archive_root)
            .map_err(|e| ArchiveError::FatalIo {
                context: "cannot create archive folder",
                path: archive_root.to_path_buf(),
                source: e,
            })?;

        let dir = claim_batch_dir(&self.fs, archive_root, batch).map_err(|e| {
            ArchiveError::FatalIo {
                context: "cannot create batch folder",
                path: archive_root.join(batch),
                source: e,
            }
        })?;
        tracing::info!("Created batch folder {}", dir.display());
        Ok(dir)
    }

    /// Renames one entry into the batch, returning where it landed.
    fn move_entry(&self, entry: &EntryInfo, batch_dir: &Path) -> ArchiveResult<PathBuf> {
        let target_dir = match self.shortcut_dir(entry, batch_dir) {
            Some(dir) => {
                if !self.dry_run {
                    self.fs
                        .create_dir_all(&dir)
                        .map_err(|e| ArchiveError::Move {
                            from: entry.path.clone(),
                            to: dir.clone(),
                            source: e,
                        })?;
                }
                dir
            }
            None => batch_dir.to_path_buf(),
        };

        let destination = unique_destination(&self.fs, &target_dir, &entry.file_name);
        if self.dry_run {
            return Ok(destination);
        }

        self.fs
            .rename(&entry.path, &destination)
            .map_err(|e| ArchiveError::Move {
                from: entry.path.clone(),
                to: destination.clone(),
                source: e,
            })?;
        tracing::debug!("Moved {} to {}", entry.path.display(), destination.display());
        Ok(destination)
    }

    fn shortcut_dir(&self, entry: &EntryInfo, batch_dir: &Path) -> Option<PathBuf> {
        let folder = self.config.shortcuts_folder_name.as_ref()?;
        if entry.is_dir {
            return None;
        }
        let ext = Path::new(&entry.file_name)
            .extension()?
            .to_string_lossy()
            .to_lowercase();
        SHORTCUT_EXTENSIONS
            .contains(&ext.as_str())
            .then(|| batch_dir.join(folder))
    }

    fn record(&self, journal: &mut dyn Journal, entry: LogEntry) -> ArchiveResult<()> {
        if self.dry_run {
            return Ok(());
        }
        record_or_fatal(journal, &entry)
    }
}

/// Archives `sources` on the real filesystem with `config`.
///
/// # Errors
///
/// Returns [`ArchiveError::Configuration`] for an invalid configuration and
/// [`ArchiveError::FatalIo`] when the run had to stop.
///
/// # Examples
///
/// ```no_run
/// use declutter::archiver;
/// use declutter::config::ArchiveConfig;
/// use declutter::journal::MemoryJournal;
/// use declutter::source::SourceFolder;
///
/// let sources = vec![SourceFolder::from_path("/home/me/Desktop")];
/// let mut journal = MemoryJournal::new();
/// let result = archiver::run(&sources, &ArchiveConfig::default(), &mut journal).unwrap();
/// println!("moved {} entries", result.moved);
/// ```
pub fn run(
    sources: &[SourceFolder],
    config: &ArchiveConfig,
    journal: &mut dyn Journal,
) -> ArchiveResult<RunResult> {
    Archiver::new(RealFileSystem, config.clone())?.run(sources, journal)
}
