use chrono::{Local, TimeZone};
use declutter::cli::{CliOutcome, RunOptions, run_cli_with};
use declutter::{ArchiveConfig, Archiver, FileJournal, RealFileSystem, RunResult, SourceFolder};
/// Integration tests for declutter
///
/// These tests run the archiver end to end against real temporary folders.
///
/// Test categories:
/// 1. Basic archiving workflows
/// 2. Exclusion rules
/// 3. Batch folders and collisions
/// 4. Unavailable sources
/// 5. Pruning
/// 6. Configuration, log file and dry-run
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary home with a `Desktop` source folder and a log file location.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    /// Create a new fixture with an empty `Desktop` folder.
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("Desktop")).expect("Failed to create Desktop");
        TestFixture { temp_dir }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The source folder under test.
    fn desktop(&self) -> PathBuf {
        self.root().join("Desktop")
    }

    fn archive(&self) -> PathBuf {
        self.desktop().join("Archive")
    }

    fn log_path(&self) -> PathBuf {
        self.root().join("logs").join("declutter.log")
    }

    /// Create a file with content in the source folder.
    fn create_file(&self, name: &str, content: &str) {
        let file_path = self.desktop().join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content.as_bytes())
            .expect("Failed to write file content");
    }

    /// Write a configuration file next to the source folder.
    fn write_config(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, content).expect("Failed to write config");
        path
    }

    /// Options for an unattended run of the Desktop folder.
    fn options(&self) -> RunOptions {
        RunOptions {
            config_path: Some(self.root().join("missing.toml")),
            sources: vec![self.desktop()],
            log_file: Some(self.log_path()),
            assume_yes: true,
            ..RunOptions::default()
        }
    }

    fn run(&self, options: &RunOptions) -> RunResult {
        match run_cli_with(options, &mut Cursor::new(""), None).expect("Run should succeed") {
            CliOutcome::Completed(result) => result,
            CliOutcome::Cancelled => panic!("Run should not be cancelled"),
        }
    }

    /// Batch folder names under the archive folder, sorted.
    fn batches(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.archive()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Log file lines split into their tab-separated fields.
    fn log_lines(&self) -> Vec<Vec<String>> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect()
    }

    /// The log line for an entry name, if any.
    fn log_line_for(&self, name: &str) -> Option<Vec<String>> {
        let source = self.desktop().join(name).to_string_lossy().to_string();
        self.log_lines().into_iter().find(|fields| fields[1] == source)
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.desktop().join(rel_path);
        assert!(
            path.exists() && path.is_file(),
            "File should exist: {}",
            path.display()
        );
    }

    fn assert_not_exists(&self, rel_path: &str) {
        let path = self.desktop().join(rel_path);
        assert!(!path.exists(), "Path should not exist: {}", path.display());
    }
}

// ============================================================================
// Test Suite 1: Basic Archiving
// ============================================================================

#[test]
fn test_scenario_tmp_pdf_and_archive_folder() {
    let fixture = TestFixture::new();
    fixture.create_file("a.tmp", "scratch");
    fixture.create_file("report.pdf", "%PDF-1.4");
    fixture.create_file("Archive/Jan-01-2026_09-00AM/older.pdf", "old");

    let result = fixture.run(&fixture.options());

    assert_eq!((result.moved, result.skipped, result.failed), (1, 1, 0));
    fixture.assert_file_exists("a.tmp");
    fixture.assert_not_exists("report.pdf");

    let batches = fixture.batches();
    assert_eq!(batches.len(), 2, "old batch plus one new batch");
    let new_batch = result.folders[0].batch.clone().expect("a batch was created");
    assert!(new_batch.join("report.pdf").is_file());
    fixture.assert_file_exists("Archive/Jan-01-2026_09-00AM/older.pdf");

    let moved = fixture.log_line_for("report.pdf").expect("moved entry logged");
    assert_eq!(moved[2], new_batch.join("report.pdf").to_string_lossy());
    assert_eq!(moved[3], "moved");

    let skipped = fixture.log_line_for("a.tmp").expect("skipped entry logged");
    assert_eq!(skipped[2], "");
    assert_eq!(skipped[3], "skipped");

    assert!(fixture.log_line_for("Archive").is_none());
}

#[test]
fn test_preserves_names_and_content() {
    let fixture = TestFixture::new();
    fixture.create_file("my notes (final).txt", "keep this exact text");
    fixture.create_file("archive.tar.gz", "bytes");

    let result = fixture.run(&fixture.options());

    let batch = result.folders[0].batch.clone().unwrap();
    let content = fs::read_to_string(batch.join("my notes (final).txt")).unwrap();
    assert_eq!(content, "keep this exact text");
    assert!(batch.join("archive.tar.gz").is_file());
    assert_eq!(result.bytes_moved, 20 + 5);
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_name_is_kept_byte_for_byte() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let fixture = TestFixture::new();
    let raw = OsStr::from_bytes(b"caf\xe9.txt");
    fs::write(fixture.desktop().join(raw), "latin-1 name").unwrap();

    let result = fixture.run(&fixture.options());

    assert_eq!(result.moved, 1);
    let batch = result.folders[0].batch.clone().unwrap();
    let moved: Vec<_> = fs::read_dir(&batch)
        .unwrap()
        .flatten()
        .map(|e| e.file_name())
        .collect();
    assert_eq!(moved, vec![raw.to_os_string()]);
    assert_eq!(fs::read_to_string(batch.join(raw)).unwrap(), "latin-1 name");
    assert!(!fixture.desktop().join(raw).exists());
}

#[test]
fn test_subfolders_move_as_a_whole() {
    let fixture = TestFixture::new();
    fixture.create_file("project/src/main.rs", "fn main() {}");

    let result = fixture.run(&fixture.options());

    assert_eq!(result.moved, 1);
    let batch = result.folders[0].batch.clone().unwrap();
    assert!(batch.join("project").join("src").join("main.rs").is_file());
    fixture.assert_not_exists("project");
}

#[test]
fn test_empty_folder_creates_no_archive() {
    let fixture = TestFixture::new();

    let result = fixture.run(&fixture.options());

    assert_eq!(result.moved, 0);
    assert_eq!(result.folders[0].batch, None);
    assert!(!fixture.archive().exists());
    assert!(fixture.log_lines().is_empty());
}

// ============================================================================
// Test Suite 2: Exclusion Rules
// ============================================================================

#[test]
fn test_default_system_files_stay() {
    let fixture = TestFixture::new();
    fixture.create_file("desktop.ini", "[.ShellClassInfo]");
    fixture.create_file("Thumbs.db", "");
    fixture.create_file(".DS_Store", "");
    fixture.create_file("movie.mkv.crdownload", "partial");
    fixture.create_file("photo.jpg", "jpg");

    let result = fixture.run(&fixture.options());

    assert_eq!((result.moved, result.skipped), (1, 4));
    for name in ["desktop.ini", "Thumbs.db", ".DS_Store", "movie.mkv.crdownload"] {
        fixture.assert_file_exists(name);
        let line = fixture.log_line_for(name).expect("skip is logged");
        assert_eq!(line[3], "skipped");
    }
}

#[test]
fn test_configured_exclusions() {
    let fixture = TestFixture::new();
    let config = fixture.write_config(
        "declutter.toml",
        r#"
excluded_extensions = [".LOG"]
excluded_names = ["keep.txt"]
excluded_patterns = ["~$*"]
excluded_regex = ["^draft_"]
skip_hidden = false
"#,
    );
    fixture.create_file("server.log", "");
    fixture.create_file("KEEP.TXT", "");
    fixture.create_file("~$budget.xlsx", "");
    fixture.create_file("draft_letter.docx", "");
    fixture.create_file(".hidden_but_allowed", "");
    fixture.create_file("desktop.ini", "");

    let options = RunOptions {
        config_path: Some(config),
        ..fixture.options()
    };
    let result = fixture.run(&options);

    assert_eq!((result.moved, result.skipped), (2, 4));
    fixture.assert_file_exists("server.log");
    fixture.assert_file_exists("KEEP.TXT");
    fixture.assert_file_exists("~$budget.xlsx");
    fixture.assert_file_exists("draft_letter.docx");
    fixture.assert_not_exists(".hidden_but_allowed");
    // excluded_names replaces the defaults
    fixture.assert_not_exists("desktop.ini");
}

// ============================================================================
// Test Suite 3: Batches and Collisions
// ============================================================================

#[test]
fn test_two_runs_same_minute_use_two_batches() {
    let fixture = TestFixture::new();
    let now = Local.with_ymd_and_hms(2026, 10, 17, 15, 45, 0).unwrap();
    let source = vec![SourceFolder::from_path(fixture.desktop())];

    fixture.create_file("notes.txt", "first");
    let mut journal = FileJournal::open(&fixture.log_path()).unwrap();
    Archiver::new(RealFileSystem, ArchiveConfig::default())
        .unwrap()
        .with_clock(now)
        .run(&source, &mut journal)
        .unwrap();

    fixture.create_file("notes.txt", "second");
    Archiver::new(RealFileSystem, ArchiveConfig::default())
        .unwrap()
        .with_clock(now)
        .run(&source, &mut journal)
        .unwrap();

    assert_eq!(
        fixture.batches(),
        vec![
            "Oct-17-2026_03-45PM".to_string(),
            "Oct-17-2026_03-45PM (1)".to_string()
        ]
    );
    let first = fs::read_to_string(fixture.archive().join("Oct-17-2026_03-45PM/notes.txt")).unwrap();
    let second =
        fs::read_to_string(fixture.archive().join("Oct-17-2026_03-45PM (1)/notes.txt")).unwrap();
    assert_eq!(first, "first");
    assert_eq!(second, "second");
    assert_eq!(fixture.log_lines().len(), 2);
}

#[test]
fn test_log_file_inside_source_is_not_moved() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    let options = RunOptions {
        log_file: Some(fixture.desktop().join("declutter.log")),
        ..fixture.options()
    };

    let result = fixture.run(&options);

    assert_eq!((result.moved, result.skipped), (1, 1));
    fixture.assert_file_exists("declutter.log");
}

#[test]
fn test_log_file_reached_through_parent_hop_is_not_moved() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    let options = RunOptions {
        log_file: Some(
            fixture
                .desktop()
                .join("..")
                .join("Desktop")
                .join("declutter.log"),
        ),
        ..fixture.options()
    };

    let result = fixture.run(&options);

    assert_eq!((result.moved, result.skipped), (1, 1));
    fixture.assert_file_exists("declutter.log");
    let log = fs::read_to_string(fixture.desktop().join("declutter.log")).unwrap();
    assert!(log.lines().any(|line| line.ends_with("\tskipped\tlog file")));
}

#[cfg(unix)]
#[test]
fn test_log_file_reached_through_symlink_is_not_moved() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    let link = fixture.root().join("desk-link");
    std::os::unix::fs::symlink(fixture.desktop(), &link).unwrap();
    let options = RunOptions {
        log_file: Some(link.join("declutter.log")),
        ..fixture.options()
    };

    let result = fixture.run(&options);

    assert_eq!((result.moved, result.skipped), (1, 1));
    fixture.assert_file_exists("declutter.log");
}

// ============================================================================
// Test Suite 4: Unavailable Sources
// ============================================================================

#[test]
fn test_missing_source_does_not_stop_others() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    let options = RunOptions {
        sources: vec![fixture.root().join("Downloads"), fixture.desktop()],
        ..fixture.options()
    };

    let result = fixture.run(&options);

    assert_eq!(result.moved, 1);
    assert_eq!(result.folders.len(), 2);
    assert!(!result.folders[0].available);
    assert!(result.folders[1].available);
    assert!(!fixture.root().join("Downloads").exists());
}

// ============================================================================
// Test Suite 5: Pruning
// ============================================================================

#[test]
fn test_pruning_removes_only_old_batches() {
    let fixture = TestFixture::new();
    let config = fixture.write_config("declutter.toml", "max_archive_age_days = 7\n");
    let now = Local::now();
    let old = declutter::batch::batch_name(&(now - chrono::Duration::days(30)));
    let recent = declutter::batch::batch_name(&(now - chrono::Duration::days(2)));
    fixture.create_file(&format!("Archive/{}/old.pdf", old), "old");
    fixture.create_file(&format!("Archive/{}/recent.pdf", recent), "recent");
    fixture.create_file("Archive/readme.txt", "loose file in archive");
    fixture.create_file("today.txt", "today");

    let options = RunOptions {
        config_path: Some(config),
        ..fixture.options()
    };
    let result = fixture.run(&options);

    assert_eq!(result.pruned, 1);
    assert!(!fixture.archive().join(&old).exists());
    fixture.assert_file_exists(&format!("Archive/{}/recent.pdf", recent));
    fixture.assert_file_exists("Archive/readme.txt");
    let batch = result.folders[0].batch.clone().unwrap();
    assert!(batch.join("today.txt").is_file());

    let pruned: Vec<_> = fixture
        .log_lines()
        .into_iter()
        .filter(|fields| fields[3] == "pruned")
        .collect();
    assert_eq!(pruned.len(), 1);
}

// ============================================================================
// Test Suite 6: Configuration, Log File and Dry Run
// ============================================================================

#[test]
fn test_malformed_config_falls_back_to_defaults() {
    let fixture = TestFixture::new();
    let config = fixture.write_config("declutter.toml", "excluded_names = [unterminated");
    fixture.create_file("desktop.ini", "");
    fixture.create_file("report.pdf", "");

    let options = RunOptions {
        config_path: Some(config),
        ..fixture.options()
    };
    let result = fixture.run(&options);

    assert_eq!((result.moved, result.skipped), (1, 1));
    fixture.assert_file_exists("desktop.ini");
}

#[test]
fn test_json_config_custom_archive_name() {
    let fixture = TestFixture::new();
    let config = fixture.write_config(
        "config.json",
        r#"{ "archive_folder_name": "Old Stuff", "excluded_extensions": [] }"#,
    );
    fixture.create_file("Old Stuff/previous.txt", "");
    fixture.create_file("a.tmp", "");

    let options = RunOptions {
        config_path: Some(config),
        ..fixture.options()
    };
    let result = fixture.run(&options);

    assert_eq!(result.moved, 1);
    let batch = result.folders[0].batch.clone().unwrap();
    assert!(batch.starts_with(fixture.desktop().join("Old Stuff")));
    assert!(batch.join("a.tmp").is_file());
    fixture.assert_file_exists("Old Stuff/previous.txt");
}

#[test]
fn test_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    fixture.create_file("a.tmp", "tmp");

    let options = RunOptions {
        dry_run: true,
        assume_yes: false,
        ..fixture.options()
    };
    let result = fixture.run(&options);

    assert!(result.dry_run);
    assert_eq!((result.moved, result.skipped), (1, 1));
    fixture.assert_file_exists("report.pdf");
    fixture.assert_file_exists("a.tmp");
    assert!(!fixture.archive().exists());
    assert!(!fixture.log_path().exists());
}

#[test]
fn test_log_is_appended_across_runs() {
    let fixture = TestFixture::new();
    fixture.create_file("one.txt", "1");
    fixture.run(&fixture.options());
    fixture.create_file("two.txt", "2");
    fixture.run(&fixture.options());

    let lines = fixture.log_lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0][1].ends_with("one.txt"));
    assert!(lines[1][1].ends_with("two.txt"));
    assert!(lines.iter().all(|fields| fields[3] == "moved"));
}

#[test]
fn test_unwritable_log_location_is_fatal() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    // A regular file where the log directory should be
    fs::write(fixture.root().join("logs"), "not a directory").unwrap();

    let err = run_cli_with(&fixture.options(), &mut Cursor::new(""), None).unwrap_err();

    assert!(err.is_fatal());
    fixture.assert_file_exists("report.pdf");
}
