//! Error types shared across the integrity engine

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeimdallError {
    /// Bad algorithm name, unusable root, malformed ignore or config file.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Monitoring cycle cancelled")]
    Cancelled,
}

impl HeimdallError {
    /// Only configuration problems stop the process; everything else is
    /// recoverable on the next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HeimdallError::Config(_))
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        HeimdallError::Config(msg.into())
    }
}

/// Problems with a persisted baseline. A baseline hitting any of these is
/// discarded and the cycle proceeds as a first run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("baseline {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("baseline {path:?} uses unsupported format version {found}")]
    UnsupportedFormat { path: PathBuf, found: u32 },

    #[error("baseline {path:?} belongs to {stored:?}, not {requested:?}")]
    RootMismatch {
        path: PathBuf,
        stored: PathBuf,
        requested: PathBuf,
    },

    #[error("baseline {path:?} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, HeimdallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_config_errors_are_fatal() {
        assert!(HeimdallError::config("bad algorithm").is_fatal());
        assert!(!HeimdallError::Cancelled.is_fatal());
        let read = HeimdallError::Read {
            path: PathBuf::from("a.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(!read.is_fatal());
    }
}
