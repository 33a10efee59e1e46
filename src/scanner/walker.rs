//! Directory walker producing digest records.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, which walks a directory tree
//! depth-first with [`walkdir`] and yields one [`FileRecord`] per regular
//! file it tried to hash. The walk is lazy: nothing is read until the
//! iterator is driven.
//!
//! # Rules
//!
//! - Every directory (and the root) is checked against the
//!   [`EligibilityPolicy`]; a rejected directory is pruned with its whole
//!   subtree and nothing beneath it is counted.
//! - Symbolic links are never followed and never hashed.
//! - Every non-directory entry in an eligible directory counts as handled,
//!   then lands in exactly one of hashed, unhashable, stat error or
//!   non-regular.
//! - Order of directories and files is whatever the OS returns.
//!
//! # Example
//!
//! ```no_run
//! use fhashd::scanner::{Algorithm, Hasher, PermissiveEligibility, Walker};
//! use fhashd::store::HashStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = HashStore::new();
//! let walker = Walker::new(
//!     Path::new("/data"),
//!     Arc::new(PermissiveEligibility),
//!     Hasher::new(Algorithm::Sha256),
//! );
//! let stored = walker.scan_into(&store);
//! println!("{} records, {:?}", stored, store.status_snapshot());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::eligibility::{is_regular, EligibilityPolicy};
use super::{DigestValue, FileRecord, Hasher, ScanError};
use crate::store::{HashStore, ScanCounters};

/// Depth-first tree scanner.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Directory gate
    policy: Arc<dyn EligibilityPolicy>,
    /// Digest engine
    hasher: Hasher,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("policy", &self.policy.name())
            .field("hasher", &self.hasher)
            .field("shutdown_flag", &self.shutdown_flag.is_some())
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given root.
    ///
    /// Relative roots are made absolute against the current directory so
    /// that every record carries an absolute path.
    #[must_use]
    pub fn new(root: &Path, policy: Arc<dyn EligibilityPolicy>, hasher: Hasher) -> Self {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self {
            root,
            policy,
            hasher,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walk stops at the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the tree, yielding one record per regular file hashed.
    ///
    /// Failed digests are yielded too (as [`DigestValue::Failed`]); stat
    /// errors and non-regular entries only touch `counters`.
    pub fn walk<'a>(
        &'a self,
        counters: &'a ScanCounters,
    ) -> impl Iterator<Item = FileRecord> + 'a {
        let policy = Arc::clone(&self.policy);

        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() > 0 && !entry.file_type().is_dir() {
                    return true;
                }
                let eligible = policy.is_block_backed(entry.path());
                if !eligible {
                    log::debug!("Skipping non-block-backed {}", entry.path().display());
                }
                eligible
            })
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |result| match result {
                Ok(entry) => self.process_entry(entry, counters),
                Err(e) => {
                    log::debug!("Skipping unreadable entry: {}", self.convert_walk_error(e));
                    None
                }
            })
    }

    /// Walk the tree and store every record.
    ///
    /// Returns the number of records stored.
    pub fn scan_into(&self, store: &HashStore) -> usize {
        let mut stored = 0;
        for record in self.walk(store.counters()) {
            store.put_record(record);
            stored += 1;
        }
        log::debug!("Scan of {} stored {} records", self.root.display(), stored);
        stored
    }

    /// Classify and hash one entry.
    fn process_entry(&self, entry: DirEntry, counters: &ScanCounters) -> Option<FileRecord> {
        if entry.file_type().is_dir() {
            return None;
        }
        counters.record_handled();

        let metadata = match std::fs::symlink_metadata(entry.path()) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Cannot stat {}: {}", entry.path().display(), e);
                counters.record_stat_error();
                return None;
            }
        };

        if !is_regular(&metadata) {
            log::trace!("Skipping non-regular file: {}", entry.path().display());
            counters.record_non_regular();
            return None;
        }

        let digest = DigestValue::from(self.hasher.digest(entry.path()));
        match &digest {
            DigestValue::Hex(_) => counters.record_hashed(),
            DigestValue::Failed(reason) => {
                log::debug!("Unhashable: {}", reason);
                counters.record_unhashable();
            }
        }

        Some(FileRecord::new(entry.into_path(), self.hasher.algorithm(), digest))
    }

    /// Convert a walkdir error to ScanError.
    fn convert_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        match error.into_io_error() {
            Some(io) => match io.kind() {
                std::io::ErrorKind::NotFound => ScanError::NotFound(path),
                std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path),
                _ => ScanError::Io { path, source: io },
            },
            None => ScanError::Io {
                path,
                source: std::io::Error::other("walk error"),
            },
        }
    }
}
