//! Scanner module for eligibility checks, directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Block-device gating of directories before descending them
//! - Lazy, depth-first directory walking using walkdir
//! - Streaming content digests (SHA-256 by default)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`eligibility`]: Block-device and regular-file checks
//! - [`hasher`]: Streaming file digests
//! - [`walker`]: Directory traversal producing [`FileRecord`]s
//!
//! # Example
//!
//! ```no_run
//! use fhashd::scanner::{Algorithm, Hasher, PermissiveEligibility, Walker};
//! use fhashd::store::ScanCounters;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let counters = ScanCounters::default();
//! let walker = Walker::new(
//!     Path::new("/data"),
//!     Arc::new(PermissiveEligibility),
//!     Hasher::new(Algorithm::Sha256),
//! );
//! for record in walker.walk(&counters) {
//!     println!("{}: {}", record.path.display(), record.digest);
//! }
//! ```

pub mod eligibility;
pub mod hasher;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use eligibility::{
    is_regular, select_policy, BlockDeviceRegistry, EligibilityPolicy, PermissiveEligibility,
    DEFAULT_BLOCK_REGISTRY,
};
pub use hasher::{Algorithm, DigestValue, Hasher};
pub use walker::Walker;

/// Outcome of hashing one file.
///
/// A record for a path always replaces any earlier one wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Digest function used
    pub algorithm: Algorithm,
    /// Hex digest, or why the file could not be read
    pub digest: DigestValue,
}

impl FileRecord {
    /// Create a new FileRecord.
    #[must_use]
    pub fn new(path: PathBuf, algorithm: Algorithm, digest: DigestValue) -> Self {
        Self {
            path,
            algorithm,
            digest,
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The non-blocking read had no data ready.
    #[error("Read would block: {0}")]
    WouldBlock(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while opening or reading `path`.
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::WouldBlock => Self::WouldBlock(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
