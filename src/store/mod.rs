//! Shared path → digest table.
//!
//! # Overview
//!
//! [`HashStore`] is the single in-memory map from absolute path to
//! [`HashEntry`], plus the [`ScanCounters`] the scanner updates. One instance
//! is constructed at startup and handed out as an `Arc<HashStore>` to the
//! scanner, the cache layer and the query endpoint.
//!
//! # Concurrency
//!
//! The table sits behind one `RwLock`. A digest and its algorithm are stored
//! together as one [`HashEntry`], so a reader sees either the previous entry
//! for a path or the new one, never a mix. Counters are plain atomics and do
//! not take the lock.

pub mod counters;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::scanner::{Algorithm, DigestValue, FileRecord};

pub use counters::{ScanCounters, StatusSnapshot};

/// Value stored for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    /// Digest or failure description
    pub digest: DigestValue,
    /// Algorithm that produced `digest`
    pub algorithm: Algorithm,
}

impl HashEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(digest: DigestValue, algorithm: Algorithm) -> Self {
        Self { digest, algorithm }
    }
}

/// Process-wide hash table and counters.
#[derive(Debug, Default)]
pub struct HashStore {
    table: RwLock<HashMap<PathBuf, HashEntry>>,
    counters: ScanCounters,
}

impl HashStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `path`.
    pub fn put(&self, path: impl Into<PathBuf>, digest: DigestValue, algorithm: Algorithm) {
        let entry = HashEntry::new(digest, algorithm);
        self.table.write().insert(path.into(), entry);
    }

    /// Insert or overwrite the entry described by a scan record.
    pub fn put_record(&self, record: FileRecord) {
        self.put(record.path, record.digest, record.algorithm);
    }

    /// Current entry for `path`, if any.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<HashEntry> {
        self.table.read().get(path).cloned()
    }

    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.counters.snapshot()
    }

    /// Counters for the scanner to update.
    #[must_use]
    pub fn counters(&self) -> &ScanCounters {
        &self.counters
    }

    /// Replace the whole table with `entries`.
    ///
    /// Not meant to race with a running scan; startup serializes the two.
    pub fn load_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (PathBuf, HashEntry)>,
    {
        let table: HashMap<PathBuf, HashEntry> = entries.into_iter().collect();
        *self.table.write() = table;
    }

    /// Cloned copy of every entry.
    #[must_use]
    pub fn entries(&self) -> Vec<(PathBuf, HashEntry)> {
        self.table
            .read()
            .iter()
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect()
    }

    /// Number of paths in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    /// Drop every entry. Counters are left untouched.
    pub fn clear(&self) {
        self.table.write().clear();
    }
}
