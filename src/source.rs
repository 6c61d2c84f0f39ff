//! Source folder resolution.
//!
//! Desktop and Downloads may be redirected by a cloud-sync client (OneDrive
//! moves them under its own root), so each known folder is looked up in the
//! cloud roots first, then in the platform's user directories, and finally
//! directly under the home directory.

use crate::fs_ops::FileSystem;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variables a sync client sets to point at its root folder.
const CLOUD_ROOT_VARS: &[&str] = &["OneDrive", "OneDriveConsumer", "OneDriveCommercial"];

/// Cloud roots checked under the home directory.
const CLOUD_ROOT_DIRS: &[&str] = &["OneDrive"];

/// The user folders swept when no explicit source is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownFolder {
    Desktop,
    Downloads,
}

impl KnownFolder {
    /// Both known folders, in processing order.
    pub const ALL: [KnownFolder; 2] = [KnownFolder::Desktop, KnownFolder::Downloads];

    /// The folder's conventional directory name.
    pub fn dir_name(&self) -> &'static str {
        match self {
            KnownFolder::Desktop => "Desktop",
            KnownFolder::Downloads => "Downloads",
        }
    }
}

impl fmt::Display for KnownFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A folder to be archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFolder {
    /// Display name used in output.
    pub label: String,
    /// Resolved location on disk.
    pub path: PathBuf,
}

impl SourceFolder {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// A source given as a bare path, labelled by its last component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { label, path }
    }
}

/// Finds the real location of known folders.
#[derive(Debug, Clone, Default)]
pub struct FolderLocator {
    home: PathBuf,
    cloud_roots: Vec<PathBuf>,
    system_dirs: HashMap<KnownFolder, PathBuf>,
}

impl FolderLocator {
    /// A locator that only knows the home directory.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cloud_roots: Vec::new(),
            system_dirs: HashMap::new(),
        }
    }

    /// Builds a locator from the current user's environment.
    ///
    /// Returns `None` when no home directory can be determined.
    pub fn from_environment() -> Option<Self> {
        let home = dirs::home_dir()?;
        let mut locator = Self::new(&home);

        for var in CLOUD_ROOT_VARS {
            if let Some(root) = std::env::var_os(var).filter(|v| !v.is_empty()) {
                locator = locator.with_cloud_root(root);
            }
        }
        for dir in CLOUD_ROOT_DIRS {
            locator = locator.with_cloud_root(home.join(dir));
        }

        if let Some(desktop) = dirs::desktop_dir() {
            locator = locator.with_system_dir(KnownFolder::Desktop, desktop);
        }
        if let Some(downloads) = dirs::download_dir() {
            locator = locator.with_system_dir(KnownFolder::Downloads, downloads);
        }
        Some(locator)
    }

    /// Adds a cloud-sync root to check before the regular locations.
    pub fn with_cloud_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if !self.cloud_roots.contains(&root) {
            self.cloud_roots.push(root);
        }
        self
    }

    /// Records the platform-reported location of a known folder.
    pub fn with_system_dir(mut self, folder: KnownFolder, path: impl Into<PathBuf>) -> Self {
        self.system_dirs.insert(folder, path.into());
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Candidate locations for `folder`, most preferred first.
    pub fn candidates(&self, folder: KnownFolder) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self
            .cloud_roots
            .iter()
            .map(|root| root.join(folder.dir_name()))
            .collect();
        if let Some(system) = self.system_dirs.get(&folder) {
            candidates.push(system.clone());
        }
        candidates.push(self.home.join(folder.dir_name()));
        candidates.dedup();
        candidates
    }

    /// Resolves `folder` to the first candidate that is an existing directory.
    ///
    /// When none exists the home-relative path is returned; the archiver
    /// reports it as unavailable.
    pub fn resolve(&self, fs: &impl FileSystem, folder: KnownFolder) -> SourceFolder {
        let candidates = self.candidates(folder);
        let chosen = candidates
            .iter()
            .find(|path| fs.is_dir(path))
            .cloned()
            .unwrap_or_else(|| self.home.join(folder.dir_name()));

        tracing::debug!("Using {} path: {}", folder, chosen.display());
        SourceFolder::new(folder.dir_name(), chosen)
    }

    /// Resolves Desktop and Downloads.
    pub fn resolve_all(&self, fs: &impl FileSystem) -> Vec<SourceFolder> {
        KnownFolder::ALL
            .iter()
            .map(|folder| self.resolve(fs, *folder))
            .collect()
    }
}
