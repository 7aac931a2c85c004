//! Change classification between two snapshots
//!
//! The engine partitions paths into added, deleted, modified and moved. It is
//! a pure function of its two inputs and never fails.

mod engine;


pub use engine::{EXHAUSTIVE_PAIR_LIMIT, diff};

use crate::snapshot::FileRecord;

/// Same path, different content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedFile {
    pub before: FileRecord,
    pub after: FileRecord,
}

impl ModifiedFile {
    pub fn path(&self) -> &str {
        &self.after.path
    }
}

/// Same content, different path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    pub from: FileRecord,
    pub to: FileRecord,
}

impl MovedFile {
    pub fn old_path(&self) -> &str {
        &self.from.path
    }

    pub fn new_path(&self) -> &str {
        &self.to.path
    }
}

/// Four disjoint, path-ordered sequences of changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<FileRecord>,
    pub deleted: Vec<FileRecord>,
    pub modified: Vec<ModifiedFile>,
    pub moved: Vec<MovedFile>,
}

impl ChangeSet {
    pub fn total(&self) -> usize {
        self.added.len() + self.deleted.len() + self.modified.len() + self.moved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// One-line count summary, e.g. `+2 -0 *1 ↔3`
    pub fn summary(&self) -> String {
        format!(
            "+{} -{} *{} ↔{}",
            self.added.len(),
            self.deleted.len(),
            self.modified.len(),
            self.moved.len()
        )
    }
}
