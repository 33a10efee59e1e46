//! Persistence of the hash table across restarts.
//!
//! # Architecture
//!
//! * [`database`]: SQLite snapshot format and the atomic write/read of it.
//! * This module: the startup decision between building a snapshot from a
//!   full scan ([`create_cache`]) and loading an existing one
//!   ([`read_cache`]).
//!
//! Exactly one of the two runs per process, chosen by whether the snapshot
//! file exists when [`bootstrap`] is called. Failures never abort the
//! process; they are logged at error level and the in-memory table is used
//! as it is.

pub mod database;

use std::path::Path;

use crate::scanner::Walker;
use crate::store::HashStore;

pub use database::{CacheError, CacheResult, HashCache};

/// What startup did with the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// An existing snapshot was loaded with this many entries.
    Loaded(usize),
    /// A full scan ran and this many rows were written.
    Created(usize),
    /// The scan was stopped by shutdown; nothing was written.
    Interrupted,
    /// The snapshot could not be read or written.
    Unavailable,
}

/// Scan from the walker's root into `store`, then write the whole store to
/// `location`.
///
/// Returns [`CacheOutcome::Interrupted`] without touching the snapshot if
/// the walker's shutdown flag was raised during the scan.
pub fn create_cache(location: &Path, store: &HashStore, walker: &Walker) -> CacheOutcome {
    log::info!("No snapshot at {}, scanning {}", location.display(), walker.root().display());
    let stored = walker.scan_into(store);

    if walker.is_shutdown_requested() {
        log::warn!("Scan interrupted after {} records, snapshot not written", stored);
        return CacheOutcome::Interrupted;
    }

    match HashCache::new(location).write_snapshot(store) {
        Ok(rows) => {
            log::info!("Snapshot created with {} entries", rows);
            CacheOutcome::Created(rows)
        }
        Err(e) => {
            log::error!("Failed to write snapshot: {}", e);
            CacheOutcome::Unavailable
        }
    }
}

/// Load the snapshot at `location` into `store`, replacing its table.
///
/// Any failure leaves `store` as it was.
pub fn read_cache(location: &Path, store: &HashStore) -> CacheOutcome {
    match HashCache::new(location).read_snapshot() {
        Ok(entries) => {
            let count = entries.len();
            store.load_all(entries);
            log::info!("Loaded {} entries from {}", count, location.display());
            CacheOutcome::Loaded(count)
        }
        Err(e) => {
            log::error!("Snapshot unavailable, continuing without it: {}", e);
            CacheOutcome::Unavailable
        }
    }
}

/// Populate `store` at startup: load the snapshot if it exists, otherwise
/// scan and create it.
pub fn bootstrap(location: &Path, store: &HashStore, walker: &Walker) -> CacheOutcome {
    if HashCache::new(location).exists() {
        read_cache(location, store)
    } else {
        create_cache(location, store, walker)
    }
}
