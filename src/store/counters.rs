//! Monotonic scan counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Five independent counters, shared between the scanner and readers.
///
/// Each counter only ever grows. Readers may observe small skew between
/// counters while a scan is running.
#[derive(Debug, Default)]
pub struct ScanCounters {
    handled: AtomicU64,
    hashed: AtomicU64,
    unhashable: AtomicU64,
    stat_errors: AtomicU64,
    non_regular: AtomicU64,
}

impl ScanCounters {
    /// A file entry was visited in an eligible directory.
    pub fn record_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    /// A file was digested successfully.
    pub fn record_hashed(&self) {
        self.hashed.fetch_add(1, Ordering::Relaxed);
    }

    /// A regular file could not be read.
    pub fn record_unhashable(&self) {
        self.unhashable.fetch_add(1, Ordering::Relaxed);
    }

    /// A file could not be stat'ed.
    pub fn record_stat_error(&self) {
        self.stat_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A file was not a regular file.
    pub fn record_non_regular(&self) {
        self.non_regular.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            unhashable: self.unhashable.load(Ordering::Relaxed),
            total_hashed: self.hashed.load(Ordering::Relaxed),
            total_handled: self.handled.load(Ordering::Relaxed),
            stat_errors: self.stat_errors.load(Ordering::Relaxed),
            non_regular: self.non_regular.load(Ordering::Relaxed),
        }
    }
}

/// Copy of the counters, serialized with the `/status` field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Regular files that could not be read
    pub unhashable: u64,
    /// Files digested successfully
    #[serde(rename = "ttl_hashed")]
    pub total_hashed: u64,
    /// File entries visited
    #[serde(rename = "ttl_handld")]
    pub total_handled: u64,
    /// Files that could not be stat'ed
    #[serde(rename = "ttl_stater")]
    pub stat_errors: u64,
    /// Entries that were not regular files
    #[serde(rename = "ttl_noregf")]
    pub non_regular: u64,
}

impl StatusSnapshot {
    /// Sum of all classified outcomes.
    #[must_use]
    pub fn classified(&self) -> u64 {
        self.total_hashed + self.unhashable + self.stat_errors + self.non_regular
    }
}
