//! Streaming file digests.
//!
//! # Overview
//!
//! The [`Hasher`] reads a regular file in large fixed-size chunks and feeds
//! each chunk into an incremental digest. The chunk size is 128 times the
//! algorithm's internal block size, so every `update` call consumes whole
//! blocks.
//!
//! On Unix the file is opened with `O_NONBLOCK`. A read that would block is a
//! terminal failure for this pass, never retried.
//!
//! # Example
//!
//! ```no_run
//! use fhashd::scanner::{Algorithm, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new(Algorithm::Sha256);
//! match hasher.digest(Path::new("/etc/hostname")) {
//!     Ok(hex) => println!("{hex}"),
//!     Err(e) => eprintln!("unhashable: {e}"),
//! }
//! ```

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use super::HashError;

/// Number of algorithm blocks read per chunk.
pub const BLOCKS_PER_CHUNK: usize = 128;

/// Digest function used for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// SHA-256 (default)
    #[default]
    Sha256,
    /// SHA-512
    Sha512,
    /// BLAKE3
    Blake3,
}

impl Algorithm {
    /// Name recorded next to every digest.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// Internal block size of the digest function, in bytes.
    #[must_use]
    pub fn block_size(self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 64,
            Self::Sha512 => 128,
        }
    }

    /// Length of a hex-encoded digest.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 64,
            Self::Sha512 => 128,
        }
    }

    /// Read chunk size used by the [`Hasher`].
    #[must_use]
    pub fn chunk_size(self) -> usize {
        self.block_size() * BLOCKS_PER_CHUNK
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown digest algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Outcome of digesting one file: a lowercase hex digest or a failure description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestValue {
    /// Lowercase hex digest.
    Hex(String),
    /// Opaque description of why the file could not be read.
    Failed(String),
}

impl DigestValue {
    /// The string form stored in the table, the snapshot and query responses.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hex(s) | Self::Failed(s) => s,
        }
    }

    /// Whether this is a real digest.
    #[must_use]
    pub fn is_hex(&self) -> bool {
        matches!(self, Self::Hex(_))
    }

    /// Rebuild a value from its stored string form.
    ///
    /// Anything that is not lowercase hex of the algorithm's digest length
    /// is a failure description.
    #[must_use]
    pub fn from_stored(text: &str, algorithm: Algorithm) -> Self {
        let is_digest = text.len() == algorithm.hex_len()
            && text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if is_digest {
            Self::Hex(text.to_string())
        } else {
            Self::Failed(text.to_string())
        }
    }
}

impl fmt::Display for DigestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Result<String, HashError>> for DigestValue {
    fn from(result: Result<String, HashError>) -> Self {
        match result {
            Ok(hex) => Self::Hex(hex),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// Incremental accumulator over the supported algorithms.
enum Accumulator {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Sha256 => Self::Sha256(Sha256::new()),
            Algorithm::Sha512 => Self::Sha512(Sha512::new()),
            Algorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Sha512(h) => format!("{:x}", h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Streaming file hasher for one algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hasher {
    algorithm: Algorithm,
}

impl Hasher {
    /// Create a hasher for the given algorithm.
    #[must_use]
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this hasher produces.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Digest a file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or any read fails,
    /// including a read that would block. The handle is closed on every path.
    pub fn digest(&self, path: &Path) -> Result<String, HashError> {
        let mut file = open_nonblocking(path).map_err(|e| HashError::from_io(path, e))?;
        let mut acc = Accumulator::new(self.algorithm);
        let mut buffer = vec![0u8; self.algorithm.chunk_size()];

        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => acc.update(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            }
        }

        Ok(acc.finalize_hex())
    }

    /// Digest an in-memory buffer.
    #[must_use]
    pub fn digest_bytes(&self, data: &[u8]) -> String {
        let mut acc = Accumulator::new(self.algorithm);
        acc.update(data);
        acc.finalize_hex()
    }
}

#[cfg(unix)]
fn open_nonblocking(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

#[cfg(not(unix))]
fn open_nonblocking(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().read(true).open(path)
}
