//! Archive configuration and exclusion rules.
//!
//! Configuration is loaded once at startup from a TOML or JSON file and then
//! passed by value into the archiver. Every field has a named default, so an
//! empty file is a valid configuration.
//!
//! # Configuration File Format
//!
//! ```toml
//! archive_folder_name = "Archive"
//! max_archive_age_days = 30
//! excluded_extensions = ["tmp", "crdownload"]
//! excluded_names = ["desktop.ini", "Thumbs.db"]
//! excluded_patterns = ["~$*"]
//! excluded_regex = []
//! skip_hidden = true
//! source_folders = []
//! # log_file = "/home/me/.local/share/declutter/declutter.log"
//! # shortcuts_folder_name = "Shortcuts"
//! ```
//!
//! The same keys are accepted in a `.json` file.

use glob::{MatchOptions, Pattern};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-source folder that holds every batch.
pub const DEFAULT_ARCHIVE_FOLDER_NAME: &str = "Archive";

/// System files and folders that are never archived.
pub const DEFAULT_EXCLUDED_NAMES: &[&str] = &[
    "desktop.ini",
    "thumbs.db",
    ".ds_store",
    "$recycle.bin",
    "recycle bin",
    "trash",
    ".localized",
];

/// Extensions of partial or temporary files that are never archived.
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &["tmp", "crdownload", "part", "partial", "download"];

/// Maximum batch age in days; zero disables pruning.
pub const DEFAULT_MAX_ARCHIVE_AGE_DAYS: u32 = 0;

/// File names looked up in the working directory when no path is given.
const LOCAL_CONFIG_FILES: &[&str] = &["declutter.toml", "config.json"];

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("cannot read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML/JSON syntax or structure.
    #[error("invalid configuration in {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    /// The archive folder name cannot be used as a single directory name.
    #[error("invalid archive folder name '{0}': expected a plain folder name")]
    InvalidArchiveFolderName(String),

    /// Invalid glob pattern provided.
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },

    /// Invalid regex pattern provided.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
}

/// Strongly-typed archive configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Extensions never moved, compared case-insensitively without the dot.
    pub excluded_extensions: Vec<String>,

    /// Exact file or folder names never moved, compared case-insensitively.
    pub excluded_names: Vec<String>,

    /// Glob patterns matched against entry names.
    pub excluded_patterns: Vec<String>,

    /// Regular expressions matched against entry names.
    pub excluded_regex: Vec<String>,

    /// Whether entries whose name starts with a dot are left alone.
    pub skip_hidden: bool,

    /// Name of the archive folder created inside each source folder.
    pub archive_folder_name: String,

    /// Batches older than this many days are pruned. Zero disables pruning.
    pub max_archive_age_days: u32,

    /// Explicit source folders. Empty means Desktop and Downloads.
    pub source_folders: Vec<PathBuf>,

    /// Where the append-only move log is written.
    pub log_file: Option<PathBuf>,

    /// Optional batch subfolder collecting shortcut files.
    pub shortcuts_folder_name: Option<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            excluded_extensions: DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_names: DEFAULT_EXCLUDED_NAMES.iter().map(|s| s.to_string()).collect(),
            excluded_patterns: Vec::new(),
            excluded_regex: Vec::new(),
            skip_hidden: true,
            archive_folder_name: DEFAULT_ARCHIVE_FOLDER_NAME.to_string(),
            max_archive_age_days: DEFAULT_MAX_ARCHIVE_AGE_DAYS,
            source_folders: Vec::new(),
            log_file: None,
            shortcuts_folder_name: None,
        }
    }
}

/// Outcome of [`ArchiveConfig::load_or_default`].
#[derive(Debug)]
pub struct LoadedConfig {
    /// The configuration to run with.
    pub config: ArchiveConfig,
    /// The file the configuration came from, if any.
    pub origin: Option<PathBuf>,
    /// Set when loading failed and the defaults were used instead.
    pub fallback: Option<ConfigError>,
}

impl ArchiveConfig {
    /// Load configuration from a file.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. `declutter.toml` then `config.json` in the current directory
    /// 3. `<config dir>/declutter/config.toml`
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read, parsed or validated.
    pub fn load(config_path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        match path {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Load configuration, falling back to the defaults on any error.
    ///
    /// The error is logged and returned in [`LoadedConfig::fallback`] so the
    /// caller can surface it.
    pub fn load_or_default(config_path: Option<&Path>) -> LoadedConfig {
        match Self::load(config_path) {
            Ok((config, origin)) => {
                match &origin {
                    Some(path) => tracing::info!("Loaded configuration from {}", path.display()),
                    None => tracing::debug!("No configuration file found, using defaults"),
                }
                LoadedConfig {
                    config,
                    origin,
                    fallback: None,
                }
            }
            Err(e) => {
                tracing::warn!("{}; falling back to built-in defaults", e);
                LoadedConfig {
                    config: Self::default(),
                    origin: None,
                    fallback: Some(e),
                }
            }
        }
    }

    /// Load and validate configuration from a specific file.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::parse(path, &content)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            toml::from_str(content).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn discover() -> Option<PathBuf> {
        let local = LOCAL_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file());
        if local.is_some() {
            return local;
        }

        dirs::config_dir()
            .map(|dir| dir.join("declutter").join("config.toml"))
            .filter(|path| path.is_file())
    }

    /// Check the values that deserialization alone cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns an error for an unusable archive folder name or any pattern
    /// that fails to compile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_folder_name(&self.archive_folder_name)?;
        if let Some(name) = &self.shortcuts_folder_name {
            validate_folder_name(name)?;
        }
        self.rules().map(|_| ())
    }

    /// Compile the exclusion settings into matchable rules.
    pub fn rules(&self) -> Result<ExclusionRules, ConfigError> {
        ExclusionRules::new(self)
    }

    /// Whether pruning is enabled.
    pub fn prunes(&self) -> bool {
        self.max_archive_age_days > 0
    }
}

fn validate_folder_name(name: &str) -> Result<(), ConfigError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
        || trimmed != name;
    if invalid {
        return Err(ConfigError::InvalidArchiveFolderName(name.to_string()));
    }
    Ok(())
}

/// The rule that caused an entry to be left in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// The name starts with a dot and hidden entries are skipped.
    Hidden,
    /// The name is in the excluded names set.
    Name,
    /// The extension is in the excluded extensions set.
    Extension(String),
    /// The name matched an excluded glob pattern.
    Pattern(String),
    /// The name matched an excluded regular expression.
    Regex(String),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::Hidden => write!(f, "hidden entry"),
            Exclusion::Name => write!(f, "excluded name"),
            Exclusion::Extension(ext) => write!(f, "excluded extension .{}", ext),
            Exclusion::Pattern(pattern) => write!(f, "excluded pattern {}", pattern),
            Exclusion::Regex(regex) => write!(f, "excluded regex {}", regex),
        }
    }
}

/// Compiled exclusion rules.
///
/// Patterns are compiled once so matching an entry never reparses them.
#[derive(Debug)]
pub struct ExclusionRules {
    skip_hidden: bool,
    names: HashSet<String>,
    extensions: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl ExclusionRules {
    fn new(config: &ArchiveConfig) -> Result<Self, ConfigError> {
        let patterns = config
            .excluded_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                    pattern: pattern.clone(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let regexes = config
            .excluded_regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skip_hidden: config.skip_hidden,
            names: config
                .excluded_names
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            extensions: config
                .excluded_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .filter(|ext| !ext.is_empty())
                .collect(),
            patterns,
            regexes,
        })
    }

    /// Returns the first rule that excludes an entry with this name.
    ///
    /// Checks run in this order: hidden, exact name, extension, glob, regex.
    pub fn check(&self, file_name: &str) -> Option<Exclusion> {
        if self.skip_hidden && file_name.starts_with('.') {
            return Some(Exclusion::Hidden);
        }

        if self.names.contains(&file_name.to_lowercase()) {
            return Some(Exclusion::Name);
        }

        if let Some(ext) = Path::new(file_name).extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if self.extensions.contains(&ext) {
                return Some(Exclusion::Extension(ext));
            }
        }

        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };
        if let Some(pattern) = self
            .patterns
            .iter()
            .find(|pattern| pattern.matches_with(file_name, options))
        {
            return Some(Exclusion::Pattern(pattern.as_str().to_string()));
        }

        self.regexes
            .iter()
            .find(|regex| regex.is_match(file_name))
            .map(|regex| Exclusion::Regex(regex.as_str().to_string()))
    }

    /// Whether any rule matches; the boolean form of [`ExclusionRules::check`].
    pub fn is_excluded(&self, file_name: &str) -> bool {
        self.check(file_name).is_some()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
