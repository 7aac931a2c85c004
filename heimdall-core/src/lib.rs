//! Core functionality for heimdall
//!
//! This crate contains the integrity engine: ignore rules, streaming
//! hashing, directory snapshots, baseline persistence and the change
//! classifier, plus thin report and notification helpers.

pub mod config;
pub mod diff;
pub mod error;
pub mod hasher;
pub mod ignore_rules;
pub mod monitor;
pub mod report;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use diff::{ChangeSet, ModifiedFile, MovedFile, diff};
pub use error::{HeimdallError, Result, StoreError};
pub use hasher::{Digest, HashAlgorithm};
pub use ignore_rules::{IGNORE_FILE_NAME, IgnoreMatcher};
pub use monitor::{BaselineState, CycleReport, Monitor, MonitorOptions};
pub use snapshot::{FileRecord, ScanOutcome, ScanWarning, Snapshot, Snapshotter};
pub use store::{LoadOutcome, SnapshotStore};
