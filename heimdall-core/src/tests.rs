//! Whole-cycle scenarios against scratch directories

use crate::error::HeimdallError;
use crate::hasher::HashAlgorithm;
use crate::monitor::{BaselineState, Monitor, MonitorOptions};
use crate::store::SnapshotStore;
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

struct Fixture {
    tree: TempDir,
    db: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self { tree: TempDir::new().unwrap(), db: TempDir::new().unwrap() }
    }

    fn root(&self) -> &Path {
        self.tree.path()
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn monitor(&self, algorithm: HashAlgorithm) -> Monitor {
        let options = MonitorOptions { hash_workers: 2, ..MonitorOptions::new(self.root(), algorithm) };
        Monitor::new(options, SnapshotStore::new(self.db.path())).unwrap()
    }
}

fn added_paths(report: &crate::monitor::CycleReport) -> Vec<&str> {
    report.changes.added.iter().map(|r| r.path.as_str()).collect()
}

#[test]
fn test_first_run_reports_everything_added() {
    let fx = Fixture::new();
    fx.write("a.txt", "a");
    fx.write("sub/b.txt", "b");

    let report = fx.monitor(HashAlgorithm::Sha256).run_cycle().unwrap();
    assert_eq!(report.baseline, BaselineState::FirstRun);
    assert_eq!(added_paths(&report), ["a.txt", "sub/b.txt"]);
    assert!(report.db_path.exists());
}

#[test]
fn test_second_run_without_changes_is_clean() {
    let fx = Fixture::new();
    fx.write("a.txt", "a");
    let monitor = fx.monitor(HashAlgorithm::Sha256);

    monitor.run_cycle().unwrap();
    let report = monitor.run_cycle().unwrap();
    assert_eq!(report.baseline, BaselineState::Loaded);
    assert!(report.changes.is_empty());
}

#[test]
fn test_full_change_classification() {
    let fx = Fixture::new();
    fx.write("keep.txt", "keep");
    fx.write("edit.txt", "v1");
    fx.write("old/name.txt", "movable");
    fx.write("remove.txt", "bye");
    let monitor = fx.monitor(HashAlgorithm::Sha256);
    monitor.run_cycle().unwrap();

    fx.write("edit.txt", "v2");
    fs::create_dir_all(fx.root().join("new")).unwrap();
    fs::rename(fx.root().join("old/name.txt"), fx.root().join("new/name.txt")).unwrap();
    fs::remove_file(fx.root().join("remove.txt")).unwrap();
    fx.write("fresh.txt", "hello");

    let changes = monitor.run_cycle().unwrap().changes;
    assert_eq!(changes.added.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(), ["fresh.txt"]);
    assert_eq!(changes.deleted.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(), ["remove.txt"]);
    assert_eq!(changes.modified.iter().map(|m| m.path()).collect::<Vec<_>>(), ["edit.txt"]);
    assert_eq!(
        changes.moved.iter().map(|m| (m.old_path(), m.new_path())).collect::<Vec<_>>(),
        [("old/name.txt", "new/name.txt")]
    );
}

#[test]
fn test_reset_makes_next_cycle_a_first_run() {
    let fx = Fixture::new();
    fx.write("a.txt", "a");
    let monitor = fx.monitor(HashAlgorithm::Sha256);
    monitor.run_cycle().unwrap();

    assert!(monitor.reset().unwrap());
    let report = monitor.run_cycle().unwrap();
    assert_eq!(report.baseline, BaselineState::FirstRun);
    assert_eq!(added_paths(&report), ["a.txt"]);
}

#[test]
fn test_ignored_build_directory_never_reaches_the_baseline() {
    let fx = Fixture::new();
    fx.write(".heimdallignore", "build/\n");
    for i in 0..200 {
        fx.write(&format!("build/gen/{}.bin", i), "artifact");
    }
    fx.write("src/lib.rs", "fn main() {}");

    let report = fx.monitor(HashAlgorithm::Sha256).run_cycle().unwrap();
    assert!(report.current.records().all(|r| !r.path.starts_with("build/")));
    assert_eq!(added_paths(&report), [".heimdallignore", "src/lib.rs"]);
}

#[test]
fn test_corrupt_baseline_degrades_to_first_run() {
    let fx = Fixture::new();
    fx.write("a.txt", "a");
    let monitor = fx.monitor(HashAlgorithm::Sha256);
    fs::write(monitor.db_path(), "garbage").unwrap();

    let report = monitor.run_cycle().unwrap();
    assert!(matches!(report.baseline, BaselineState::Discarded(_)));
    assert_eq!(added_paths(&report), ["a.txt"]);

    // The broken file was replaced by a good baseline
    assert_eq!(monitor.run_cycle().unwrap().baseline, BaselineState::Loaded);
}

#[test]
fn test_algorithm_change_rehashes_instead_of_reporting_modified() {
    let fx = Fixture::new();
    fx.write("a.txt", "a");
    fx.write("b.txt", "b");
    fx.monitor(HashAlgorithm::Sha256).run_cycle().unwrap();

    fx.write("b.txt", "changed");
    let monitor = fx.monitor(HashAlgorithm::Blake2b);
    let report = monitor.run_cycle().unwrap();

    assert_eq!(report.baseline, BaselineState::AlgorithmChanged { from: HashAlgorithm::Sha256 });
    assert_eq!(report.changes.modified.iter().map(|m| m.path()).collect::<Vec<_>>(), ["b.txt"]);
    assert_eq!(report.changes.total(), 1);
    assert_eq!(report.current.algorithm(), HashAlgorithm::Blake2b);

    let next = monitor.run_cycle().unwrap();
    assert_eq!(next.baseline, BaselineState::Loaded);
    assert!(next.changes.is_empty());
}

#[test]
fn test_cancelled_cycle_leaves_baseline_untouched() {
    let fx = Fixture::new();
    fx.write("a.txt", "a");
    let monitor = fx.monitor(HashAlgorithm::Sha256);
    monitor.run_cycle().unwrap();
    let before = fs::read_to_string(monitor.db_path()).unwrap();

    fx.write("a.txt", "tampered");
    monitor.cancel_flag().store(true, Ordering::SeqCst);
    assert!(matches!(monitor.run_cycle().unwrap_err(), HeimdallError::Cancelled));
    assert_eq!(fs::read_to_string(monitor.db_path()).unwrap(), before);
}

#[test]
fn test_missing_root_fails_before_scanning() {
    let db = TempDir::new().unwrap();
    let options = MonitorOptions::new("/definitely/not/here", HashAlgorithm::Sha256);
    let err = Monitor::new(options, SnapshotStore::new(db.path())).err().unwrap();
    assert!(err.is_fatal());
}

#[test]
fn test_malformed_ignore_file_fails_before_scanning() {
    let fx = Fixture::new();
    fx.write(".heimdallignore", "[broken\n");
    let options = MonitorOptions::new(fx.root(), HashAlgorithm::Sha256);
    let err = Monitor::new(options, SnapshotStore::new(fx.db.path())).err().unwrap();
    assert!(err.is_fatal());
}

#[test]
fn test_root_removed_between_cycles_is_recoverable() {
    let fx = Fixture::new();
    fx.write("a.txt", "a");
    let monitor = fx.monitor(HashAlgorithm::Sha256);
    monitor.run_cycle().unwrap();
    let saved = fs::read_to_string(monitor.db_path()).unwrap();

    fs::remove_dir_all(fx.root()).unwrap();
    let err = monitor.run_cycle().unwrap_err();
    assert!(!err.is_fatal());
    assert!(matches!(err, HeimdallError::Read { .. }));
    assert_eq!(fs::read_to_string(monitor.db_path()).unwrap(), saved);

    // Once the folder is back, the stored baseline is still used
    fs::create_dir(fx.root()).unwrap();
    let report = monitor.run_cycle().unwrap();
    assert_eq!(report.baseline, BaselineState::Loaded);
    let deleted: Vec<&str> = report.changes.deleted.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(deleted, ["a.txt"]);
}

#[test]
fn test_tampered_digest_degrades_to_first_run() {
    let fx = Fixture::new();
    fx.write("a.txt", "a");
    let monitor = fx.monitor(HashAlgorithm::Sha256);
    monitor.run_cycle().unwrap();

    let text = fs::read_to_string(monitor.db_path()).unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    doc["files"]["a.txt"]["digest"] = serde_json::Value::String("ca978112".to_string());
    fs::write(monitor.db_path(), doc.to_string()).unwrap();

    let report = monitor.run_cycle().unwrap();
    assert!(matches!(report.baseline, BaselineState::Discarded(_)));
    assert!(report.changes.modified.is_empty());
    assert_eq!(added_paths(&report), ["a.txt"]);
}
