//! declutter - sweep cluttered user folders into dated archives
//!
//! This library moves the entries of Desktop, Downloads or any other source
//! folder into `Archive/<Mon-DD-YYYY_HH-MMAM>` batch folders, skips system and
//! excluded files according to a TOML/JSON configuration, records every
//! attempt in an append-only log, and prunes batches past a configured age.

pub mod archiver;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs_ops;
pub mod journal;
pub mod logging;
pub mod output;
pub mod prune;
pub mod source;

pub use archiver::{Archiver, FolderReport, RunResult, run};
pub use config::{ArchiveConfig, ConfigError, ExclusionRules};
pub use error::{ArchiveError, ArchiveResult};
pub use fs_ops::{FileSystem, RealFileSystem};
pub use journal::{FileJournal, Journal, LogEntry, MemoryJournal, Outcome};
pub use source::{FolderLocator, KnownFolder, SourceFolder};

pub use cli::{CliOutcome, RunOptions, run_cli};
