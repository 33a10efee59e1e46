use fhashd::cache::{bootstrap, read_cache, CacheError, CacheOutcome, HashCache};
use fhashd::scanner::{Algorithm, Hasher, PermissiveEligibility, Walker};
use fhashd::store::HashStore;
use rusqlite::Connection;
use std::fs;
use std::sync::Arc;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_open_corrupted_snapshot() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), b"not a sqlite database").unwrap();

    let res = HashCache::new(temp_file.path()).read_snapshot();
    assert!(matches!(res, Err(CacheError::Database { .. })));
}

#[test]
fn test_wrong_schema_is_unavailable() {
    let temp_file = NamedTempFile::new().unwrap();
    let conn = Connection::open(temp_file.path()).unwrap();
    conn.execute("CREATE TABLE other (x INTEGER)", []).unwrap();
    drop(conn);

    let store = HashStore::new();
    assert_eq!(read_cache(temp_file.path(), &store), CacheOutcome::Unavailable);
    assert!(store.is_empty());
}

#[test]
fn test_corrupt_snapshot_does_not_trigger_scan() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("a.txt"), "hello").unwrap();
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), b"corrupted garbage").unwrap();

    let store = HashStore::new();
    let walker = Walker::new(
        data.path(),
        Arc::new(PermissiveEligibility),
        Hasher::new(Algorithm::Sha256),
    );

    assert_eq!(
        bootstrap(temp_file.path(), &store, &walker),
        CacheOutcome::Unavailable
    );
    assert!(store.is_empty());
    assert_eq!(store.status_snapshot().total_handled, 0);
    // The corrupt file is left for an operator to inspect
    assert_eq!(fs::read(temp_file.path()).unwrap(), b"corrupted garbage");
}

#[test]
fn test_truncated_snapshot() {
    let dir = tempdir().unwrap();
    let location = dir.path().join("fhash.db");
    let store = HashStore::new();
    for i in 0..200 {
        store.put(
            format!("/file/{i}"),
            fhashd::scanner::DigestValue::Hex(format!("{i:064x}")),
            Algorithm::Sha256,
        );
    }
    HashCache::new(&location).write_snapshot(&store).unwrap();

    let bytes = fs::read(&location).unwrap();
    fs::write(&location, &bytes[..bytes.len() / 3]).unwrap();

    let reloaded = HashStore::new();
    // Either unreadable or a clean subset; never a panic and never garbage rows
    if let CacheOutcome::Loaded(n) = read_cache(&location, &reloaded) {
        assert!(n <= 200);
        for (_, entry) in reloaded.entries() {
            assert!(entry.digest.is_hex());
        }
    }
}
