//! Removal of expired batch folders.
//!
//! Only direct subdirectories of an archive folder are candidates. Loose
//! files inside the archive folder and anything outside it are never touched.

use crate::batch::parse_batch_name;
use crate::error::ArchiveResult;
use crate::fs_ops::{EntryInfo, FileSystem};
use crate::journal::{Journal, LogEntry, record_or_fatal};
use chrono::{DateTime, Duration, Local, NaiveDateTime};
use std::path::{Path, PathBuf};

/// What a pruning pass removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    /// Batch folders that were (or, in a dry run, would be) removed.
    pub removed: Vec<PathBuf>,
    /// Batch folders that could not be removed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Age policy applied to one archive folder.
#[derive(Debug, Clone)]
pub struct PrunePolicy<'a> {
    /// Batches strictly older than this many days are removed.
    pub max_age_days: u32,
    /// The reference time for ages.
    pub now: DateTime<Local>,
    /// A batch that must survive regardless of age (the current run's).
    pub keep: Option<&'a Path>,
    /// Report without removing anything or writing to the journal.
    pub dry_run: bool,
}

impl PrunePolicy<'_> {
    fn is_expired(&self, entry: &EntryInfo) -> bool {
        if self.max_age_days == 0 {
            return false;
        }
        match batch_time(entry) {
            Some(created) => {
                self.now.naive_local() - created > Duration::days(i64::from(self.max_age_days))
            }
            None => false,
        }
    }
}

/// The time a batch folder was created.
///
/// Taken from the folder name when it follows the batch format, otherwise
/// from the modification time.
fn batch_time(entry: &EntryInfo) -> Option<NaiveDateTime> {
    parse_batch_name(&entry.name).or_else(|| {
        entry
            .modified
            .map(|modified| DateTime::<Local>::from(modified).naive_local())
    })
}

/// Removes expired batch folders from `archive_root`.
///
/// A missing or unreadable archive folder yields an empty report. Each
/// removal is recorded in `journal` as `pruned` or `failed`.
///
/// # Errors
///
/// Returns [`crate::error::ArchiveError::FatalIo`] only when the journal cannot
/// be written.
pub fn prune_archive(
    fs: &impl FileSystem,
    archive_root: &Path,
    policy: &PrunePolicy<'_>,
    journal: &mut dyn Journal,
) -> ArchiveResult<PruneReport> {
    let mut report = PruneReport::default();
    if policy.max_age_days == 0 || !fs.is_dir(archive_root) {
        return Ok(report);
    }

    let entries = match fs.list_dir(archive_root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list {} for pruning: {}", archive_root.display(), e);
            return Ok(report);
        }
    };

    for entry in entries {
        if !entry.is_dir || policy.keep == Some(entry.path.as_path()) {
            continue;
        }
        if !policy.is_expired(&entry) {
            continue;
        }

        if policy.dry_run {
            report.removed.push(entry.path);
            continue;
        }

        let record = match fs.remove_dir_all(&entry.path) {
            Ok(()) => {
                tracing::info!("Pruned expired batch {}", entry.path.display());
                report.removed.push(entry.path.clone());
                LogEntry::pruned(Local::now(), entry.path)
            }
            Err(e) => {
                tracing::warn!("Failed to prune {}: {}", entry.path.display(), e);
                report.failed.push((entry.path.clone(), e.to_string()));
                LogEntry::failed(Local::now(), entry.path, None, format!("prune: {}", e))
            }
        };

        record_or_fatal(journal, &record)?;
    }

    Ok(report)
}
