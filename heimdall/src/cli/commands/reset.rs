//! `--reset`: forget stored baselines

use anyhow::{Result, bail};
use heimdall_core::SnapshotStore;
use std::path::Path;
use tracing::info;

/// Outcome of a reset, kept separate from printing for testability
#[derive(Debug, PartialEq, Eq)]
pub enum ResetOutcome {
    Removed,
    NothingStored,
    Cleared(usize),
}

pub fn reset(store: &SnapshotStore, folder: Option<&Path>) -> Result<ResetOutcome> {
    match folder {
        Some(folder) => {
            let root = match std::fs::canonicalize(folder) {
                Ok(root) if root.is_dir() => root,
                _ => bail!(heimdall_core::HeimdallError::Config(format!(
                    "'{}' is not a directory",
                    folder.display()
                ))),
            };
            if store.reset(&root)? {
                Ok(ResetOutcome::Removed)
            } else {
                Ok(ResetOutcome::NothingStored)
            }
        }
        None => Ok(ResetOutcome::Cleared(store.reset_all()?)),
    }
}

pub fn execute(store: &SnapshotStore, folder: Option<&Path>) -> Result<()> {
    info!("Resetting baselines in {:?}", store.storage_dir());

    match reset(store, folder)? {
        ResetOutcome::Removed => {
            println!("Hash database reset for '{}'.", display(folder));
        }
        ResetOutcome::NothingStored => {
            println!("No hash database found for '{}'.", display(folder));
        }
        ResetOutcome::Cleared(0) => println!("No hash databases found to clear."),
        ResetOutcome::Cleared(n) => println!("All hash databases cleared ({} files).", n),
    }
    Ok(())
}

fn display(folder: Option<&Path>) -> String {
    folder.map(|f| f.display().to_string()).unwrap_or_default()
}
