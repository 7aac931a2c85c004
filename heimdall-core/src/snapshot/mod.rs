//! Directory snapshots
//!
//! A snapshot maps root-relative paths to the size, mtime and content digest
//! observed for each file during one scan.

pub mod scanner;

pub use scanner::{ScanOutcome, ScanWarning, Snapshotter};

use crate::hasher::{Digest, HashAlgorithm};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One tracked file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// `/`-separated path relative to the monitored root
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub digest: Digest,
    pub algorithm: HashAlgorithm,
}

impl FileRecord {
    /// Same content under the same algorithm
    pub fn same_content(&self, other: &FileRecord) -> bool {
        self.algorithm == other.algorithm && self.digest == other.digest
    }
}

/// Immutable view of a directory tree at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    root: PathBuf,
    taken_at: DateTime<Utc>,
    algorithm: HashAlgorithm,
    files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    pub fn new(
        root: impl Into<PathBuf>,
        taken_at: DateTime<Utc>,
        algorithm: HashAlgorithm,
        records: impl IntoIterator<Item = FileRecord>,
    ) -> Self {
        let files = records.into_iter().map(|r| (r.path.clone(), r)).collect();
        Self { root: root.into(), taken_at, algorithm, files }
    }

    /// A snapshot with no files, used as the baseline on a first run
    pub fn empty(root: impl Into<PathBuf>, algorithm: HashAlgorithm) -> Self {
        Self::new(root, Utc::now(), algorithm, Vec::new())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Records in ascending path order
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether digests of the two snapshots can be compared directly
    pub fn compatible_with(&self, other: &Snapshot) -> bool {
        self.algorithm == other.algorithm
    }

    pub(crate) fn files(&self) -> &BTreeMap<String, FileRecord> {
        &self.files
    }
}

/// Join path components with the canonical `/` separator.
pub fn canonical_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
