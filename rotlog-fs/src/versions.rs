//! Rotated version listing and retention.
//!
//! A version is a retired output file named `<path>.<suffix>`. Versions are
//! ordered by plain lexicographic comparison of their names, so suffixes
//! must be fixed-width timestamps for that order to be chronological.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::debug;

use crate::error::{CleanupError, FsError, RemoveFailure};

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Versions removed, oldest first.
    pub removed: Vec<PathBuf>,
    /// Versions left in place.
    pub retained: usize,
}

/// Path of the version of `path` with the given suffix.
pub fn version_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// List the versions of `path`, oldest first.
pub fn list_versions(path: &Path) -> Result<Vec<PathBuf>, FsError> {
    let pattern = format!("{}.*", Pattern::escape(&path.to_string_lossy()));

    let entries = glob::glob(&pattern).map_err(|err| FsError::List {
        pattern: pattern.clone(),
        message: err.to_string(),
    })?;

    let mut versions = entries
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| FsError::List {
            pattern: pattern.clone(),
            message: err.to_string(),
        })?;

    versions.sort();
    Ok(versions)
}

/// Remove the oldest versions of `path` so that at most `retained` remain.
///
/// A negative `retained` disables cleanup. Every stale version is attempted
/// even if an earlier removal fails; all failures are reported together.
/// A version that is already gone counts as removed.
pub fn cleanup_versions(path: &Path, retained: i64) -> Result<CleanupReport, CleanupError> {
    let Ok(keep) = usize::try_from(retained) else {
        return Ok(CleanupReport::default());
    };

    let versions = list_versions(path)?;
    let stale = versions.len().saturating_sub(keep);

    let mut report = CleanupReport {
        removed: Vec::with_capacity(stale),
        retained: versions.len() - stale,
    };
    let mut failures = Vec::new();

    for version in &versions[..stale] {
        match fs::remove_file(version) {
            Ok(()) => report.removed.push(version.clone()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                report.removed.push(version.clone());
            }
            Err(err) => failures.push(RemoveFailure::new(version, err)),
        }
    }

    debug!(
        path = %path.display(),
        removed = report.removed.len(),
        retained = report.retained,
        failed = failures.len(),
        "version cleanup finished"
    );

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(CleanupError::Remove {
            attempted: stale,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::write(path, b"").expect("create version");
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().expect("file name").to_string_lossy().into_owned())
            .collect()
    }

    // --- version_path ---

    #[test]
    fn test_version_path_appends_suffix() {
        let path = version_path(Path::new("/var/log/app/current"), "2024-01-01T000000");
        assert_eq!(path, PathBuf::from("/var/log/app/current.2024-01-01T000000"));
    }

    #[test]
    fn test_version_path_keeps_existing_extension() {
        let path = version_path(Path::new("out.log"), "1");
        assert_eq!(path, PathBuf::from("out.log.1"));
    }

    // --- list_versions ---

    #[test]
    fn test_list_versions_empty() {
        let dir = tempdir().expect("tempdir");
        let versions = list_versions(&dir.path().join("log")).expect("list");
        assert!(versions.is_empty());
    }

    #[test]
    fn test_list_versions_sorted_oldest_first() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join("log");
        touch(&log);
        touch(&version_path(&log, "2024-01-03T000000"));
        touch(&version_path(&log, "2024-01-01T000000"));
        touch(&version_path(&log, "2024-01-02T000000"));

        let versions = list_versions(&log).expect("list");
        assert_eq!(
            names(&versions),
            vec![
                "log.2024-01-01T000000",
                "log.2024-01-02T000000",
                "log.2024-01-03T000000"
            ]
        );
    }

    #[test]
    fn test_list_versions_ignores_other_files() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join("log");
        touch(&log);
        touch(&dir.path().join("logfile"));
        touch(&dir.path().join("other.1"));
        touch(&version_path(&log, "1"));

        let versions = list_versions(&log).expect("list");
        assert_eq!(names(&versions), vec!["log.1"]);
    }

    #[test]
    fn test_list_versions_escapes_metacharacters() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join("app[1]");
        touch(&version_path(&log, "a"));
        touch(&dir.path().join("app1.b"));

        let versions = list_versions(&log).expect("list");
        assert_eq!(names(&versions), vec!["app[1].a"]);
    }

    // --- cleanup_versions ---

    #[test]
    fn test_cleanup_removes_oldest() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join("log");
        for suffix in ["1", "2", "3", "4", "5"] {
            touch(&version_path(&log, suffix));
        }

        let report = cleanup_versions(&log, 2).expect("cleanup");
        assert_eq!(names(&report.removed), vec!["log.1", "log.2", "log.3"]);
        assert_eq!(report.retained, 2);
        assert_eq!(names(&list_versions(&log).expect("list")), vec!["log.4", "log.5"]);
    }

    #[test]
    fn test_cleanup_under_limit_is_noop() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join("log");
        touch(&version_path(&log, "1"));

        let report = cleanup_versions(&log, 4).expect("cleanup");
        assert!(report.removed.is_empty());
        assert_eq!(report.retained, 1);
    }

    #[test]
    fn test_cleanup_zero_removes_all() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join("log");
        touch(&log);
        touch(&version_path(&log, "1"));
        touch(&version_path(&log, "2"));

        let report = cleanup_versions(&log, 0).expect("cleanup");
        assert_eq!(report.removed.len(), 2);
        assert!(list_versions(&log).expect("list").is_empty());
        assert!(log.exists(), "active file untouched");
    }

    #[test]
    fn test_cleanup_negative_disabled() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join("log");
        for suffix in ["1", "2", "3"] {
            touch(&version_path(&log, suffix));
        }

        let report = cleanup_versions(&log, -1).expect("cleanup");
        assert_eq!(report, CleanupReport::default());
        assert_eq!(list_versions(&log).expect("list").len(), 3);
    }

    #[test]
    fn test_overlapping_cleanups_all_succeed() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let dir = tempdir().expect("tempdir");
        let log = dir.path().join("log");
        for i in 0..300 {
            touch(&version_path(&log, &format!("{:04}", i)));
        }

        let start = Arc::new(Barrier::new(4));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let start = start.clone();
                let log = log.clone();
                thread::spawn(move || {
                    start.wait();
                    cleanup_versions(&log, 2)
                })
            })
            .collect();

        for worker in workers {
            let report = worker
                .join()
                .expect("worker")
                .expect("overlapping cleanup succeeds");
            assert_eq!(report.retained, 2);
        }

        assert_eq!(
            names(&list_versions(&log).expect("list")),
            vec!["log.0298", "log.0299"]
        );
    }

    #[test]
    fn test_cleanup_collects_every_failure() {
        let dir = tempdir().expect("tempdir");
        let log = dir.path().join("log");
        // Directories named like versions cannot be removed with remove_file.
        fs::create_dir(version_path(&log, "1")).expect("mkdir");
        fs::create_dir(version_path(&log, "2")).expect("mkdir");
        touch(&version_path(&log, "3"));
        touch(&version_path(&log, "4"));

        let err = cleanup_versions(&log, 1).expect_err("directories cannot be removed");
        match err {
            CleanupError::Remove {
                attempted,
                failures,
            } => {
                assert_eq!(attempted, 3);
                assert_eq!(failures.len(), 2);
            }
            other => panic!("expected Remove, got {:?}", other),
        }

        // The removable stale version was still removed.
        assert!(!version_path(&log, "3").exists());
        assert!(version_path(&log, "4").exists());
    }
}
