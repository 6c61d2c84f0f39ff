//! Filesystem capability used by the archiver.
//!
//! Every side effect the archiver has on disk goes through [`FileSystem`], so
//! the archiving logic can be exercised against a fake that injects failures.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A direct child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// The entry's file name exactly as stored on disk.
    pub file_name: OsString,
    /// Lossy UTF-8 form of `file_name`, for rule matching and display.
    pub name: String,
    /// The full path to the entry.
    pub path: PathBuf,
    /// Whether the entry is a directory (symlinks are not followed).
    pub is_dir: bool,
    /// Size in bytes for regular files, zero otherwise.
    pub len: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

/// The filesystem operations the archiver and pruner rely on.
pub trait FileSystem {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists the direct children of `path`, sorted by name.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>>;

    /// Creates `path` and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Creates exactly `path`, failing with `AlreadyExists` if it is taken.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Moves `from` to `to` in a single rename.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes a directory and everything beneath it.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Resolves `path` to an absolute form with symlinks and `..` removed.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

impl<T: FileSystem + ?Sized> FileSystem for &T {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>> {
        (**self).list_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).create_dir_all(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        (**self).create_dir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).remove_dir_all(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path)
    }
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata so dangling links still count as taken names
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let metadata = entry.metadata().ok();
            let file_name = entry.file_name();
            entries.push(EntryInfo {
                name: file_name.to_string_lossy().into_owned(),
                file_name,
                path: entry.path(),
                is_dir: metadata.as_ref().is_some_and(|m| m.is_dir()),
                len: metadata
                    .as_ref()
                    .filter(|m| m.is_file())
                    .map_or(0, |m| m.len()),
                modified: metadata.and_then(|m| m.modified().ok()),
            });
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}
