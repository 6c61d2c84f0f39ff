//! Batch folder naming and the numeric-suffix collision rule.
//!
//! A batch is named after the local time of the run, e.g.
//! `Oct-17-2026_03-45PM`. When a name is already taken, ` (1)`, ` (2)`, ...
//! is appended, before the extension for files.

use crate::fs_ops::FileSystem;
use chrono::{DateTime, Local, NaiveDateTime};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

/// chrono format of a batch folder name.
pub const BATCH_NAME_FORMAT: &str = "%b-%d-%Y_%I-%M%p";

/// Give up on suffixes after this many attempts.
const MAX_SUFFIX: u32 = 9999;

/// Returns the batch folder name for a run started at `now`.
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use declutter::batch::batch_name;
///
/// let now = Local.with_ymd_and_hms(2026, 10, 17, 15, 45, 12).unwrap();
/// assert_eq!(batch_name(&now), "Oct-17-2026_03-45PM");
/// ```
pub fn batch_name(now: &DateTime<Local>) -> String {
    now.format(BATCH_NAME_FORMAT).to_string()
}

/// Parses a batch folder name back into its timestamp.
///
/// A trailing collision suffix such as ` (2)` is ignored. Returns `None` for
/// names that were not produced by [`batch_name`].
pub fn parse_batch_name(name: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(strip_suffix(name), BATCH_NAME_FORMAT).ok()
}

fn strip_suffix(name: &str) -> &str {
    if let Some(open) = name.rfind(" (")
        && let Some(digits) = name[open + 2..].strip_suffix(')')
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
    {
        return &name[..open];
    }
    name
}

/// Builds the `n`th collision variant of `file_name`.
///
/// `report.pdf` becomes `report (n).pdf`; names without an extension, and
/// dot-files, get the suffix at the end. Bytes that are not valid UTF-8 are
/// carried over unchanged.
pub fn suffixed_name(file_name: &OsStr, n: u32) -> OsString {
    let path = Path::new(file_name);
    let mut name = path.file_stem().unwrap_or(file_name).to_os_string();
    name.push(format!(" ({})", n));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Returns a path in `dir` for `file_name` that nothing currently occupies.
pub fn unique_destination(fs: &impl FileSystem, dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !fs.exists(&candidate) {
        return candidate;
    }

    (1..=MAX_SUFFIX)
        .map(|n| dir.join(suffixed_name(file_name, n)))
        .find(|path| !fs.exists(path))
        .unwrap_or_else(|| {
            let mut stamped = file_name.to_os_string();
            stamped.push(format!("_{}", Local::now().timestamp_millis()));
            dir.join(stamped)
        })
}

/// Creates a fresh batch folder named `name` inside `archive_root`.
///
/// The folder is claimed with an exclusive create, so two runs in the same
/// minute (or two processes at once) never share a batch.
///
/// # Errors
///
/// Returns the underlying error for anything other than a taken name, or
/// `AlreadyExists` once every suffix is exhausted.
pub fn claim_batch_dir(
    fs: &impl FileSystem,
    archive_root: &Path,
    name: &str,
) -> io::Result<PathBuf> {
    let candidates = std::iter::once(name.to_string())
        .chain((1..=MAX_SUFFIX).map(|n| format!("{} ({})", name, n)));

    for candidate in candidates {
        let path = archive_root.join(&candidate);
        match fs.create_dir(&path) {
            Ok(()) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free batch folder name for {}", name),
    ))
}
