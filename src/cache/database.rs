//! SQLite-backed snapshot of the hash table.
//!
//! The snapshot is a single table:
//!
//! ```sql
//! CREATE TABLE fhash (
//!     path      TEXT PRIMARY KEY,
//!     digest    TEXT NOT NULL,
//!     algorithm TEXT NOT NULL
//! )
//! ```
//!
//! On Unix `path` holds the raw file-name bytes as a BLOB; TEXT paths from
//! older snapshots are still read.
//!
//! Writes go to a temporary database next to the destination and are
//! renamed into place after the transaction commits, so a reader never
//! sees a half-written snapshot.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use tempfile::NamedTempFile;

use crate::scanner::{Algorithm, DigestValue};
use crate::store::{HashEntry, HashStore};

/// Errors raised while reading or writing the snapshot.
///
/// None of these are fatal: callers degrade to whatever is in memory.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// No snapshot exists at the location.
    #[error("No snapshot at {0}")]
    Missing(PathBuf),

    /// SQLite failed to open, query or write the snapshot.
    #[error("Database error for {path}: {source}")]
    Database {
        /// Snapshot location
        path: PathBuf,
        /// Underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A row named an algorithm this build does not know.
    #[error("Unknown algorithm '{algorithm}' for {row_path} in {path}")]
    UnknownAlgorithm {
        /// Snapshot location
        path: PathBuf,
        /// Path column of the offending row
        row_path: String,
        /// Algorithm column of the offending row
        algorithm: String,
    },

    /// Creating or publishing the temporary file failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Snapshot location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS fhash (
    path TEXT PRIMARY KEY,
    digest TEXT NOT NULL,
    algorithm TEXT NOT NULL
)";

/// Handle on the snapshot location.
#[derive(Debug, Clone)]
pub struct HashCache {
    location: PathBuf,
}

impl HashCache {
    /// Snapshot stored at `location`.
    #[must_use]
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// Snapshot file path.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Whether a snapshot file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.location.is_file()
    }

    /// Write every entry of `store` as a fresh snapshot.
    ///
    /// Rows that violate the primary key are logged and dropped. Returns the
    /// number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the temporary database cannot be created,
    /// written, or renamed over the destination.
    pub fn write_snapshot(&self, store: &HashStore) -> CacheResult<usize> {
        let dir = match self.location.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;
        let temp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;

        let written = {
            let mut conn = Connection::open(temp.path()).map_err(|e| self.db_error(e))?;
            conn.execute(CREATE_TABLE, []).map_err(|e| self.db_error(e))?;

            let tx = conn.transaction().map_err(|e| self.db_error(e))?;
            let mut written = 0;
            {
                let mut stmt = tx
                    .prepare("INSERT INTO fhash (path, digest, algorithm) VALUES (?1, ?2, ?3)")
                    .map_err(|e| self.db_error(e))?;

                for (path, entry) in store.entries() {
                    match stmt.execute(params![
                        path_to_column(&path),
                        entry.digest.as_str(),
                        entry.algorithm.name()
                    ]) {
                        Ok(_) => written += 1,
                        Err(e) if is_constraint_violation(&e) => {
                            log::warn!("Dropping duplicate snapshot row {}: {}", path.display(), e);
                        }
                        Err(e) => return Err(self.db_error(e)),
                    }
                }
            }
            tx.commit().map_err(|e| self.db_error(e))?;
            conn.close().map_err(|(_, e)| self.db_error(e))?;
            written
        };

        temp.persist(&self.location).map_err(|e| self.io_error(e.error))?;
        log::debug!("Wrote {} snapshot rows to {}", written, self.location.display());
        Ok(written)
    }

    /// Read every row of the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Missing`] if there is no snapshot, and another
    /// [`CacheError`] if it cannot be opened or any row cannot be parsed.
    pub fn read_snapshot(&self) -> CacheResult<Vec<(PathBuf, HashEntry)>> {
        if !self.exists() {
            return Err(CacheError::Missing(self.location.clone()));
        }

        let conn = Connection::open_with_flags(
            &self.location,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| self.db_error(e))?;

        let mut stmt = conn
            .prepare("SELECT path, digest, algorithm FROM fhash")
            .map_err(|e| self.db_error(e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    path_from_column(row.get_ref(0)?)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| self.db_error(e))?;

        let mut entries = Vec::new();
        for row in rows {
            let (path, digest, algorithm_name) = row.map_err(|e| self.db_error(e))?;
            let algorithm: Algorithm =
                algorithm_name.parse().map_err(|_| CacheError::UnknownAlgorithm {
                    path: self.location.clone(),
                    row_path: path.display().to_string(),
                    algorithm: algorithm_name.clone(),
                })?;
            let digest = DigestValue::from_stored(&digest, algorithm);
            entries.push((path, HashEntry::new(digest, algorithm)));
        }

        Ok(entries)
    }

    fn db_error(&self, source: rusqlite::Error) -> CacheError {
        CacheError::Database {
            path: self.location.clone(),
            source,
        }
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.location.clone(),
            source,
        }
    }
}

/// Raw path bytes for the `path` column.
///
/// Unix file names are arbitrary bytes, so they are stored as a BLOB rather
/// than a lossily converted string.
#[cfg(unix)]
fn path_to_column(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_to_column(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

/// Rebuild a path from a `path` column holding either a BLOB or TEXT.
fn path_from_column(value: ValueRef<'_>) -> rusqlite::Result<PathBuf> {
    match value {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Ok(path_from_bytes(bytes)),
        other => Err(rusqlite::Error::InvalidColumnType(
            0,
            "path".to_string(),
            other.data_type(),
        )),
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}
