//! Directory walker that turns a tree into a [`Snapshot`]
//!
//! Enumeration is sequential and prunes ignored directories up front.
//! Hashing fans out over a bounded rayon pool; results are merged by path so
//! the snapshot never depends on completion order.

use super::{FileRecord, Snapshot, canonical_relative};
use crate::error::{HeimdallError, Result};
use crate::hasher::{HashAlgorithm, hash_file};
use crate::ignore_rules::IgnoreMatcher;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A file that could not be recorded during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Result of one scan: the snapshot plus every file that had to be skipped
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub snapshot: Snapshot,
    pub warnings: Vec<ScanWarning>,
}

/// A regular file found during enumeration, not yet hashed
struct Candidate {
    absolute: PathBuf,
    relative: String,
}

#[derive(Clone)]
pub struct Snapshotter {
    pool: Arc<rayon::ThreadPool>,
    cancel: Arc<AtomicBool>,
}

impl fmt::Debug for Snapshotter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshotter")
            .field("workers", &self.pool.current_num_threads())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Snapshotter {
    /// Create a snapshotter hashing with at most `workers` threads
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("heimdall-hash-{}", i))
            .build()
            .map_err(|e| HeimdallError::config(format!("cannot start hashing pool: {}", e)))?;

        Ok(Self { pool: Arc::new(pool), cancel: Arc::new(AtomicBool::new(false)) })
    }

    /// Share an externally owned cancel flag
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Walk `root` and hash every regular file not excluded by `matcher`.
    pub fn scan(
        &self,
        root: &Path,
        matcher: &IgnoreMatcher,
        algorithm: HashAlgorithm,
    ) -> Result<ScanOutcome> {
        check_root(root)?;
        let taken_at = Utc::now();

        let (candidates, mut warnings) = enumerate(root, matcher);
        debug!("Found {} candidate files under {:?}", candidates.len(), root);

        if self.is_cancelled() {
            return Err(HeimdallError::Cancelled);
        }

        let total = candidates.len();
        let results: Vec<Option<std::result::Result<FileRecord, ScanWarning>>> =
            self.pool.install(|| {
                candidates
                    .par_iter()
                    .map(|candidate| {
                        if self.is_cancelled() {
                            return None;
                        }
                        Some(record_file(candidate, algorithm))
                    })
                    .collect()
            });

        if self.is_cancelled() {
            return Err(HeimdallError::Cancelled);
        }

        let mut records = Vec::with_capacity(total);
        for result in results.into_iter().flatten() {
            match result {
                Ok(record) => {
                    debug!("Hashed: {}", record.path);
                    records.push(record);
                }
                Err(warning) => warnings.push(warning),
            }
        }

        for warning in &warnings {
            warn!("Skipped {}", warning);
        }

        let snapshot = Snapshot::new(root, taken_at, algorithm, records);
        info!(
            "Scanned {:?}: {} files recorded, {} skipped ({})",
            root,
            snapshot.len(),
            warnings.len(),
            algorithm
        );

        Ok(ScanOutcome { snapshot, warnings })
    }
}

/// A root that vanishes between cycles is a read failure for that cycle only;
/// startup validation lives in `Monitor::new`.
fn check_root(root: &Path) -> Result<()> {
    let unreadable =
        |source: std::io::Error| HeimdallError::Read { path: root.to_path_buf(), source };

    let metadata = std::fs::metadata(root).map_err(unreadable)?;
    if !metadata.is_dir() {
        return Err(unreadable(std::io::Error::other("not a directory")));
    }
    std::fs::read_dir(root).map_err(unreadable)?;
    Ok(())
}

fn enumerate(root: &Path, matcher: &IgnoreMatcher) -> (Vec<Candidate>, Vec<ScanWarning>) {
    let mut candidates = Vec::new();
    let mut warnings = Vec::new();

    let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        let relative = match entry.path().strip_prefix(root) {
            Ok(rel) => canonical_relative(rel),
            Err(_) => return true,
        };
        let ignored = matcher.should_ignore(&relative, entry.file_type().is_dir());
        if ignored {
            debug!("Ignored: {}", relative);
        }
        !ignored
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                warnings.push(ScanWarning { path, reason: e.to_string() });
                continue;
            }
        };

        // Symlinks are never followed and never recorded
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(rel) => canonical_relative(rel),
            Err(_) => continue,
        };
        candidates.push(Candidate { absolute: entry.into_path(), relative });
    }

    (candidates, warnings)
}

fn record_file(
    candidate: &Candidate,
    algorithm: HashAlgorithm,
) -> std::result::Result<FileRecord, ScanWarning> {
    let warning = |reason: String| ScanWarning { path: candidate.absolute.clone(), reason };

    let metadata =
        std::fs::symlink_metadata(&candidate.absolute).map_err(|e| warning(e.to_string()))?;
    if !metadata.is_file() {
        return Err(warning("no longer a regular file".to_string()));
    }
    let modified: DateTime<Utc> =
        metadata.modified().map(DateTime::<Utc>::from).map_err(|e| warning(e.to_string()))?;

    let digest = hash_file(&candidate.absolute, algorithm).map_err(|e| warning(e.to_string()))?;

    Ok(FileRecord {
        path: candidate.relative.clone(),
        size: metadata.len(),
        modified,
        digest,
        algorithm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_bytes;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scanner() -> Snapshotter {
        Snapshotter::new(2).unwrap()
    }

    #[test]
    fn test_scan_records_relative_paths_and_digests() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", "alpha");
        write(dir.path(), "nested/deeper/b.txt", "beta");

        let outcome =
            scanner().scan(dir.path(), &IgnoreMatcher::empty(), HashAlgorithm::Sha256).unwrap();
        let snap = outcome.snapshot;

        assert!(outcome.warnings.is_empty());
        assert_eq!(snap.len(), 2);
        let b = snap.get("nested/deeper/b.txt").unwrap();
        assert_eq!(b.size, 4);
        assert_eq!(b.digest, hash_bytes(b"beta", HashAlgorithm::Sha256));
        assert_eq!(b.algorithm, HashAlgorithm::Sha256);
        assert_eq!(snap.root(), dir.path());
    }

    #[test]
    fn test_ignored_directory_is_pruned() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".heimdallignore", "build/\n*.tmp\n");
        for i in 0..50 {
            write(dir.path(), &format!("build/out/{}.o", i), "obj");
        }
        write(dir.path(), "src/main.c", "int main;");
        write(dir.path(), "src/scratch.tmp", "junk");

        let matcher = IgnoreMatcher::compile(dir.path()).unwrap();
        let snap = scanner().scan(dir.path(), &matcher, HashAlgorithm::Sha256).unwrap().snapshot;

        assert!(snap.records().all(|r| !r.path.starts_with("build/")));
        assert!(snap.contains("src/main.c"));
        assert!(!snap.contains("src/scratch.tmp"));
        assert!(snap.contains(".heimdallignore"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "real/file.txt", "data");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("real/loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/file.txt"), dir.path().join("link.txt"))
            .unwrap();

        let snap = scanner()
            .scan(dir.path(), &IgnoreMatcher::empty(), HashAlgorithm::Sha1)
            .unwrap()
            .snapshot;

        let paths: Vec<&str> = snap.records().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["real/file.txt"]);
    }

    #[test]
    fn test_missing_root_is_a_recoverable_read_error() {
        let dir = TempDir::new().unwrap();
        let absent = dir.path().join("absent");
        let err =
            scanner().scan(&absent, &IgnoreMatcher::empty(), HashAlgorithm::Sha256).unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, HeimdallError::Read { ref path, .. } if *path == absent));
    }

    #[test]
    fn test_file_as_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "plain.txt", "x");
        let err = scanner()
            .scan(&dir.path().join("plain.txt"), &IgnoreMatcher::empty(), HashAlgorithm::Sha256)
            .unwrap_err();
        assert!(matches!(err, HeimdallError::Read { .. }));
    }

    #[test]
    fn test_vanished_file_becomes_warning() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "keep.txt", "keep");
        let candidate = Candidate {
            absolute: dir.path().join("gone.txt"),
            relative: "gone.txt".to_string(),
        };

        let warning = record_file(&candidate, HashAlgorithm::Sha256).unwrap_err();
        assert_eq!(warning.path, dir.path().join("gone.txt"));
    }

    #[test]
    fn test_cancelled_scan_produces_no_snapshot() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", "a");

        let cancel = Arc::new(AtomicBool::new(true));
        let snapshotter = scanner().with_cancel(cancel);
        let err = snapshotter
            .scan(dir.path(), &IgnoreMatcher::empty(), HashAlgorithm::Sha256)
            .unwrap_err();
        assert!(matches!(err, HeimdallError::Cancelled));
    }

    #[test]
    fn test_scan_is_independent_of_worker_count() {
        let dir = TempDir::new().unwrap();
        for i in 0..40 {
            write(dir.path(), &format!("d{}/f{}.txt", i % 4, i), &format!("content {}", i));
        }

        let one = Snapshotter::new(1)
            .unwrap()
            .scan(dir.path(), &IgnoreMatcher::empty(), HashAlgorithm::Md5)
            .unwrap()
            .snapshot;
        let many = Snapshotter::new(8)
            .unwrap()
            .scan(dir.path(), &IgnoreMatcher::empty(), HashAlgorithm::Md5)
            .unwrap()
            .snapshot;

        assert!(one.records().eq(many.records()));
    }
}
