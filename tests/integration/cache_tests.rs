use fhashd::cache::{bootstrap, create_cache, read_cache, CacheOutcome, HashCache};
use fhashd::scanner::{Algorithm, Hasher, PermissiveEligibility, Walker};
use fhashd::store::HashStore;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn walker(root: &Path) -> Walker {
    Walker::new(
        root,
        Arc::new(PermissiveEligibility),
        Hasher::new(Algorithm::Sha256),
    )
}

fn sorted(store: &HashStore) -> Vec<(std::path::PathBuf, fhashd::store::HashEntry)> {
    let mut entries = store.entries();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

#[test]
fn test_create_then_read_round_trip() {
    let data = tempdir().unwrap();
    for i in 0..20 {
        fs::write(data.path().join(format!("file_{i}.txt")), format!("content {i}")).unwrap();
    }
    fs::create_dir(data.path().join("sub")).unwrap();
    fs::write(data.path().join("sub").join("deep.txt"), "deep").unwrap();

    let cache_dir = tempdir().unwrap();
    let location = cache_dir.path().join("fhash.db");

    let original = HashStore::new();
    assert_eq!(
        create_cache(&location, &original, &walker(data.path())),
        CacheOutcome::Created(21)
    );

    let reloaded = HashStore::new();
    assert_eq!(read_cache(&location, &reloaded), CacheOutcome::Loaded(21));
    assert_eq!(sorted(&original), sorted(&reloaded));
}

#[test]
fn test_bootstrap_reads_existing_without_scanning() {
    let data = tempdir().unwrap();
    fs::write(data.path().join("a.txt"), "hello").unwrap();
    let cache_dir = tempdir().unwrap();
    let location = cache_dir.path().join("fhash.db");

    let first = HashStore::new();
    bootstrap(&location, &first, &walker(data.path()));

    let second = HashStore::new();
    let outcome = bootstrap(&location, &second, &walker(data.path()));

    assert_eq!(outcome, CacheOutcome::Loaded(1));
    assert_eq!(second.status_snapshot(), Default::default());
    assert_eq!(sorted(&first), sorted(&second));
}

#[test]
fn test_failed_digests_survive_round_trip() {
    let cache_dir = tempdir().unwrap();
    let location = cache_dir.path().join("fhash.db");

    let store = HashStore::new();
    store.put(
        "/data/locked",
        fhashd::scanner::DigestValue::Failed("Permission denied: /data/locked".into()),
        Algorithm::Sha256,
    );
    HashCache::new(&location).write_snapshot(&store).unwrap();

    let reloaded = HashStore::new();
    read_cache(&location, &reloaded);
    let entry = reloaded.get(Path::new("/data/locked")).unwrap();
    assert!(!entry.digest.is_hex());
    assert_eq!(entry.digest.as_str(), "Permission denied: /data/locked");
}

#[test]
fn test_snapshot_overwrite_is_complete() {
    let cache_dir = tempdir().unwrap();
    let location = cache_dir.path().join("fhash.db");
    let cache = HashCache::new(&location);

    let big = HashStore::new();
    for i in 0..50 {
        big.put(
            format!("/f{i}"),
            fhashd::scanner::DigestValue::Hex(format!("{i:064x}")),
            Algorithm::Sha256,
        );
    }
    cache.write_snapshot(&big).unwrap();

    let small = HashStore::new();
    small.put(
        "/only",
        fhashd::scanner::DigestValue::Hex(format!("{:064x}", 7)),
        Algorithm::Sha256,
    );
    cache.write_snapshot(&small).unwrap();

    assert_eq!(cache.read_snapshot().unwrap().len(), 1);
}

#[cfg(unix)]
#[test]
fn test_non_utf8_file_names_round_trip() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let data = tempdir().unwrap();
    let first = data.path().join(OsStr::from_bytes(b"bad\xff.bin"));
    let second = data.path().join(OsStr::from_bytes(b"bad\xfe.bin"));
    fs::write(&first, "first").unwrap();
    fs::write(&second, "second").unwrap();

    let cache_dir = tempdir().unwrap();
    let location = cache_dir.path().join("fhash.db");

    let original = HashStore::new();
    assert_eq!(
        create_cache(&location, &original, &walker(data.path())),
        CacheOutcome::Created(2)
    );

    let reloaded = HashStore::new();
    assert_eq!(read_cache(&location, &reloaded), CacheOutcome::Loaded(2));
    assert_eq!(sorted(&original), sorted(&reloaded));
    assert_eq!(reloaded.get(&first), original.get(&first));
    assert_ne!(
        reloaded.get(&first).unwrap().digest,
        reloaded.get(&second).unwrap().digest
    );
}
