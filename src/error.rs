//! Error taxonomy for archiving runs.
//!
//! Only [`ArchiveError::FatalIo`] aborts a run. Configuration problems fall
//! back to defaults, unavailable sources are skipped, and move failures are
//! contained to the entry that caused them.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while archiving source folders.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The configuration could not be loaded or validated.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A source folder is missing or cannot be listed.
    #[error("source folder {} is unavailable: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single entry could not be moved into its batch folder.
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive destination or the log stream could not be established.
    #[error("{context} ({}): {source}", .path.display())]
    FatalIo {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    /// Returns true for errors that must stop the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalIo { .. })
    }
}

/// Result type for archiving operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
