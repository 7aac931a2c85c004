//! Streaming content digests
//!
//! Files are read in fixed-size chunks and fed to an incremental accumulator,
//! so memory use does not depend on file size.

use crate::error::{HeimdallError, Result};
use blake2::{Blake2b512, Blake2s256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::Sha1;
use sha2::Digest as _;
use sha2::{Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Read buffer size used while hashing
const CHUNK_SIZE: usize = 64 * 1024;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha1,
    Md5,
    Sha512,
    Blake2b,
    Blake2s,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 6] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha1,
        HashAlgorithm::Md5,
        HashAlgorithm::Sha512,
        HashAlgorithm::Blake2b,
        HashAlgorithm::Blake2s,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake2b => "blake2b",
            HashAlgorithm::Blake2s => "blake2s",
        }
    }

    /// Digest length in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha512 => 64,
            HashAlgorithm::Blake2b => 64,
            HashAlgorithm::Blake2s => 32,
        }
    }

    fn accumulator(&self) -> Accumulator {
        match self {
            HashAlgorithm::Sha256 => Accumulator::Sha256(Sha256::new()),
            HashAlgorithm::Sha1 => Accumulator::Sha1(Sha1::new()),
            HashAlgorithm::Md5 => Accumulator::Md5(md5::Context::new()),
            HashAlgorithm::Sha512 => Accumulator::Sha512(Sha512::new()),
            HashAlgorithm::Blake2b => Accumulator::Blake2b(Blake2b512::new()),
            HashAlgorithm::Blake2s => Accumulator::Blake2s(Blake2s256::new()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HeimdallError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        HashAlgorithm::ALL
            .into_iter()
            .find(|alg| alg.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = HashAlgorithm::ALL.iter().map(|a| a.as_str()).collect();
                HeimdallError::config(format!(
                    "unknown hash algorithm '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Incremental digest state for one file
enum Accumulator {
    Sha256(Sha256),
    Sha1(Sha1),
    Md5(md5::Context),
    Sha512(Sha512),
    Blake2b(Blake2b512),
    Blake2s(Blake2s256),
}

impl Accumulator {
    fn update(&mut self, chunk: &[u8]) {
        match self {
            Accumulator::Sha256(h) => h.update(chunk),
            Accumulator::Sha1(h) => h.update(chunk),
            Accumulator::Md5(h) => h.consume(chunk),
            Accumulator::Sha512(h) => h.update(chunk),
            Accumulator::Blake2b(h) => h.update(chunk),
            Accumulator::Blake2s(h) => h.update(chunk),
        }
    }

    fn finish(self) -> Digest {
        let bytes = match self {
            Accumulator::Sha256(h) => h.finalize().to_vec(),
            Accumulator::Sha1(h) => h.finalize().to_vec(),
            Accumulator::Md5(h) => h.compute().0.to_vec(),
            Accumulator::Sha512(h) => h.finalize().to_vec(),
            Accumulator::Blake2b(h) => h.finalize().to_vec(),
            Accumulator::Blake2s(h) => h.finalize().to_vec(),
        };
        Digest(bytes)
    }
}

/// Raw digest bytes; persisted and displayed as lowercase hex
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(Vec<u8>);

impl Digest {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Digest(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map(Digest).map_err(serde::de::Error::custom)
    }
}

/// Hash a file's full contents
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<Digest> {
    let read_err = |source| HeimdallError::Read { path: path.to_path_buf(), source };

    let mut file = File::open(path).map_err(read_err)?;
    let mut acc = algorithm.accumulator();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_err(e)),
        };
        acc.update(&buf[..n]);
    }

    Ok(acc.finish())
}

/// Hash an in-memory buffer
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> Digest {
    let mut acc = algorithm.accumulator();
    acc.update(data);
    acc.finish()
}
