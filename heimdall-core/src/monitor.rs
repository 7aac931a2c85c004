//! One monitoring cycle: scan, load baseline, diff, persist

use crate::diff::{ChangeSet, diff};
use crate::error::{HeimdallError, Result};
use crate::hasher::HashAlgorithm;
use crate::ignore_rules::IgnoreMatcher;
use crate::snapshot::{ScanWarning, Snapshot, Snapshotter};
use crate::store::{LoadOutcome, SnapshotStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub root: PathBuf,
    pub algorithm: HashAlgorithm,
    pub extra_ignore: Vec<String>,
    pub hash_workers: usize,
}

impl MonitorOptions {
    pub fn new(root: impl Into<PathBuf>, algorithm: HashAlgorithm) -> Self {
        Self { root: root.into(), algorithm, extra_ignore: Vec::new(), hash_workers: 1 }
    }
}

/// How the baseline for a cycle was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineState {
    Loaded,
    /// Nothing stored yet, or the store was reset
    FirstRun,
    /// A stored baseline existed but could not be used
    Discarded(String),
    /// The stored baseline was hashed with a different algorithm
    AlgorithmChanged { from: HashAlgorithm },
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub changes: ChangeSet,
    pub current: Snapshot,
    pub warnings: Vec<ScanWarning>,
    pub baseline: BaselineState,
    pub db_path: PathBuf,
}

pub struct Monitor {
    root: PathBuf,
    algorithm: HashAlgorithm,
    matcher: IgnoreMatcher,
    snapshotter: Snapshotter,
    store: SnapshotStore,
}

impl Monitor {
    /// Resolve the root and compile ignore rules. Every configuration error
    /// surfaces here, before any scanning.
    pub fn new(options: MonitorOptions, store: SnapshotStore) -> Result<Self> {
        let root = std::fs::canonicalize(&options.root).map_err(|e| {
            HeimdallError::config(format!("cannot resolve '{}': {}", options.root.display(), e))
        })?;
        if !root.is_dir() {
            return Err(HeimdallError::config(format!("'{}' is not a directory", root.display())));
        }
        std::fs::read_dir(&root).map_err(|e| {
            HeimdallError::config(format!("cannot read directory '{}': {}", root.display(), e))
        })?;

        let matcher = IgnoreMatcher::compile_with(&root, &options.extra_ignore)?;
        let snapshotter = Snapshotter::new(options.hash_workers)?;

        Ok(Self { root, algorithm: options.algorithm, matcher, snapshotter, store })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn matcher(&self) -> &IgnoreMatcher {
        &self.matcher
    }

    pub fn db_path(&self) -> PathBuf {
        self.store.path_for(&self.root)
    }

    /// Raising this flag abandons the running cycle before the store is touched
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.snapshotter.cancel_flag()
    }

    /// Delete the stored baseline so the next cycle behaves like a first run
    pub fn reset(&self) -> Result<bool> {
        self.store.reset(&self.root)
    }

    pub fn run_cycle(&self) -> Result<CycleReport> {
        info!("Scanning {:?}", self.root);
        let scan = self.snapshotter.scan(&self.root, &self.matcher, self.algorithm)?;
        let current = scan.snapshot;
        let mut warnings = scan.warnings;

        let (changes, baseline) = match self.store.load(&self.root) {
            LoadOutcome::Loaded(stored) if stored.compatible_with(&current) => {
                (diff(&stored, &current), BaselineState::Loaded)
            }
            LoadOutcome::Loaded(stored) => {
                let from = stored.algorithm();
                warn!(
                    "Baseline was hashed with {}, now using {}; re-hashing with {} to compare",
                    from, self.algorithm, from
                );
                let rehashed = self.snapshotter.scan(&self.root, &self.matcher, from)?;
                merge_warnings(&mut warnings, rehashed.warnings);
                (diff(&stored, &rehashed.snapshot), BaselineState::AlgorithmChanged { from })
            }
            LoadOutcome::Absent => {
                info!("No baseline for {:?}, creating one", self.root);
                let empty = Snapshot::empty(&self.root, self.algorithm);
                (diff(&empty, &current), BaselineState::FirstRun)
            }
            LoadOutcome::Unusable(e) => {
                warn!("Discarding unusable baseline: {}", e);
                let empty = Snapshot::empty(&self.root, self.algorithm);
                (diff(&empty, &current), BaselineState::Discarded(e.to_string()))
            }
        };

        if self.cancel_flag().load(Ordering::SeqCst) {
            return Err(HeimdallError::Cancelled);
        }

        let db_path = self.store.save(&current)?;
        info!(
            "Cycle complete: {} ({} files in baseline)",
            changes.summary(),
            current.len()
        );

        Ok(CycleReport { changes, current, warnings, baseline, db_path })
    }
}

/// Files that failed only during the baseline-algorithm re-hash show up as
/// deleted, so their warnings are kept alongside the main scan's.
fn merge_warnings(warnings: &mut Vec<ScanWarning>, extra: Vec<ScanWarning>) {
    for warning in extra {
        if !warnings.iter().any(|seen| seen.path == warning.path) {
            warnings.push(warning);
        }
    }
}
