//! Persistent baselines
//!
//! One JSON document per monitored root, named from a hash of the root's
//! absolute path. Writes go through a temp file in the same directory and an
//! atomic rename, so an interrupted save leaves the previous baseline intact.
//!
//! Two processes monitoring the same root at once are not coordinated: the
//! last writer wins.

use crate::error::{HeimdallError, Result, StoreError};
use crate::hasher::{Digest, HashAlgorithm, hash_bytes};
use crate::snapshot::{FileRecord, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Current on-disk format
pub const FORMAT_VERSION: u32 = 1;

const FILE_PREFIX: &str = "heimdall_";
const FILE_SUFFIX: &str = ".json";
const KEY_LEN: usize = 16;

#[derive(Debug, Serialize, Deserialize)]
struct StoredSnapshot {
    format_version: u32,
    root: PathBuf,
    algorithm: HashAlgorithm,
    taken_at: DateTime<Utc>,
    files: BTreeMap<String, StoredFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredFile {
    size: u64,
    modified: DateTime<Utc>,
    digest: Digest,
    algorithm: HashAlgorithm,
}

/// Only the version field, read first so newer formats are rejected cleanly
#[derive(Deserialize)]
struct VersionHeader {
    format_version: u32,
}

/// What [`SnapshotStore::load`] found
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Snapshot),
    /// No baseline has been saved for this root
    Absent,
    /// A baseline exists but cannot be used; callers treat it as absent
    Unusable(StoreError),
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    storage_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self { storage_dir: storage_dir.into() }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Database file used for `root`
    pub fn path_for(&self, root: &Path) -> PathBuf {
        self.storage_dir.join(format!("{}{}{}", FILE_PREFIX, root_key(root), FILE_SUFFIX))
    }

    pub fn load(&self, root: &Path) -> LoadOutcome {
        let path = self.path_for(root);

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Absent,
            Err(source) => return LoadOutcome::Unusable(StoreError::Io { path, source }),
        };

        match decode(&path, root, &text) {
            Ok(snapshot) => {
                debug!("Loaded baseline {:?} with {} files", path, snapshot.len());
                LoadOutcome::Loaded(snapshot)
            }
            Err(e) => LoadOutcome::Unusable(e),
        }
    }

    /// Atomically replace the baseline for `snapshot.root()`
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        fs::create_dir_all(&self.storage_dir)?;
        let path = self.path_for(snapshot.root());

        let stored = StoredSnapshot {
            format_version: FORMAT_VERSION,
            root: snapshot.root().to_path_buf(),
            algorithm: snapshot.algorithm(),
            taken_at: snapshot.taken_at(),
            files: snapshot
                .records()
                .map(|r| {
                    (
                        r.path.clone(),
                        StoredFile {
                            size: r.size,
                            modified: r.modified,
                            digest: r.digest.clone(),
                            algorithm: r.algorithm,
                        },
                    )
                })
                .collect(),
        };

        let tmp = NamedTempFile::new_in(&self.storage_dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &stored)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| HeimdallError::Io(e.error))?;

        debug!("Saved baseline {:?} ({} files)", path, snapshot.len());
        Ok(path)
    }

    /// Delete the baseline for `root`. Returns whether one existed.
    pub fn reset(&self, root: &Path) -> Result<bool> {
        let path = self.path_for(root);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Removed baseline {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every baseline in the storage directory. Returns how many were removed.
    pub fn reset_all(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.storage_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        info!("Removed {} baselines from {:?}", removed, self.storage_dir);
        Ok(removed)
    }
}

/// Filesystem-safe key for a root: truncated SHA-256 of its path
fn root_key(root: &Path) -> String {
    let digest = hash_bytes(root.to_string_lossy().as_bytes(), HashAlgorithm::Sha256);
    let mut key = digest.to_hex();
    key.truncate(KEY_LEN);
    key
}

fn decode(path: &Path, root: &Path, text: &str) -> std::result::Result<Snapshot, StoreError> {
    let corrupt = |e: serde_json::Error| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let header: VersionHeader = serde_json::from_str(text).map_err(corrupt)?;
    if header.format_version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedFormat {
            path: path.to_path_buf(),
            found: header.format_version,
        });
    }

    let stored: StoredSnapshot = serde_json::from_str(text).map_err(corrupt)?;
    if stored.root != root {
        return Err(StoreError::RootMismatch {
            path: path.to_path_buf(),
            stored: stored.root,
            requested: root.to_path_buf(),
        });
    }

    if let Some((name, file)) = stored.files.iter().find(|(_, f)| f.algorithm != stored.algorithm)
    {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "record '{}' hashed with {} inside a {} snapshot",
                name, file.algorithm, stored.algorithm
            ),
        });
    }

    if let Some((name, file)) =
        stored.files.iter().find(|(_, f)| f.digest.as_bytes().len() != f.algorithm.digest_len())
    {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!(
                "record '{}' has a {}-byte digest, {} produces {}",
                name,
                file.digest.as_bytes().len(),
                file.algorithm,
                file.algorithm.digest_len()
            ),
        });
    }

    let records = stored.files.into_iter().map(|(path, f)| FileRecord {
        path,
        size: f.size,
        modified: f.modified,
        digest: f.digest,
        algorithm: f.algorithm,
    });

    Ok(Snapshot::new(stored.root, stored.taken_at, stored.algorithm, records))
}
