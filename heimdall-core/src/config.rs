//! Runtime configuration
//!
//! Values come from an optional TOML file and are then overridden by
//! command-line flags.

use crate::error::{HeimdallError, Result};
use crate::hasher::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name under the user's home used when no storage dir is configured
pub const DEFAULT_STORAGE_DIR_NAME: &str = ".heimdall";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hash algorithm name
    pub algorithm: String,

    /// Seconds between cycles in watch mode
    pub interval_secs: u64,

    /// Where baselines are kept
    pub storage_dir: PathBuf,

    /// Include file sizes in reports
    pub show_size: bool,

    /// Send a desktop notification when changes are found
    pub notifications: bool,

    /// Colored terminal output
    pub color: bool,

    /// Upper bound on concurrent hashing threads
    pub hash_workers: usize,

    /// Rules applied in addition to `.heimdallignore`
    pub extra_ignore: Vec<String>,

    /// Append every report to this file
    pub output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default().to_string(),
            interval_secs: 5,
            storage_dir: default_storage_dir(),
            show_size: false,
            notifications: true,
            color: true,
            hash_workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            extra_ignore: Vec::new(),
            output: None,
        }
    }
}

impl Config {
    /// Read a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            HeimdallError::config(format!("cannot read config file {:?}: {}", path, e))
        })?;
        toml::from_str(&text)
            .map_err(|e| HeimdallError::config(format!("invalid config file {:?}: {}", path, e)))
    }

    /// Parsed hash algorithm
    pub fn hash_algorithm(&self) -> Result<HashAlgorithm> {
        self.algorithm.parse()
    }

    pub fn validate(&self) -> Result<()> {
        self.hash_algorithm()?;
        if self.interval_secs == 0 {
            return Err(HeimdallError::config("interval must be at least one second"));
        }
        if self.hash_workers == 0 {
            return Err(HeimdallError::config("hash_workers must be at least 1"));
        }
        Ok(())
    }
}

/// `~/.heimdall`, or `./.heimdall` when no home directory is known
pub fn default_storage_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_STORAGE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR_NAME))
}
