use fhashd::scanner::{Algorithm, Hasher, PermissiveEligibility, Walker};
use fhashd::store::HashStore;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

fn walker(root: &Path, algorithm: Algorithm) -> Walker {
    Walker::new(root, Arc::new(PermissiveEligibility), Hasher::new(algorithm))
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let store = HashStore::new();

    assert_eq!(walker(dir.path(), Algorithm::Sha256).scan_into(&store), 0);
    assert!(store.is_empty());
    assert_eq!(store.status_snapshot().total_handled, 0);
}

#[cfg(unix)]
#[test]
fn test_scan_file_and_symlink() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a.txt"), "hello").unwrap();
    std::os::unix::fs::symlink("a.txt", data.join("link")).unwrap();

    let store = HashStore::new();
    walker(&data, Algorithm::Sha256).scan_into(&store);

    assert_eq!(store.len(), 1);
    let entry = store.get(&data.join("a.txt")).unwrap();
    assert_eq!(entry.digest.as_str(), HELLO_SHA256);
    assert_eq!(entry.algorithm.name(), "sha256");
    assert!(store.get(&data.join("link")).is_none());

    let status = store.status_snapshot();
    assert_eq!(status.non_regular, 1);
    assert_eq!(status.total_hashed, 1);
    assert!(status.total_handled >= status.classified());
}

#[test]
fn test_scan_nested_tree_matches_direct_digest() {
    let dir = tempdir().unwrap();
    let mut expected = Vec::new();
    for depth in 0..3 {
        let sub = (0..depth).fold(dir.path().to_path_buf(), |p, i| p.join(format!("d{i}")));
        fs::create_dir_all(&sub).unwrap();
        for n in 0..4 {
            let path = sub.join(format!("f{n}.bin"));
            let mut f = File::create(&path).unwrap();
            f.write_all(format!("depth {depth} file {n}").repeat(depth * 500 + 1).as_bytes())
                .unwrap();
            expected.push(path);
        }
    }

    let store = HashStore::new();
    walker(dir.path(), Algorithm::Blake3).scan_into(&store);
    let hasher = Hasher::new(Algorithm::Blake3);

    assert_eq!(store.len(), expected.len());
    for path in expected {
        let entry = store.get(&path).unwrap();
        assert_eq!(entry.algorithm, Algorithm::Blake3);
        assert_eq!(entry.digest.as_str(), hasher.digest_bytes(&fs::read(&path).unwrap()));
    }
}

#[test]
fn test_rescan_replaces_changed_digest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "hello").unwrap();

    let store = HashStore::new();
    let w = walker(dir.path(), Algorithm::Sha256);
    w.scan_into(&store);
    assert_eq!(store.get(&path).unwrap().digest.as_str(), HELLO_SHA256);

    fs::write(&path, "tampered").unwrap();
    w.scan_into(&store);

    let entry = store.get(&path).unwrap();
    assert_ne!(entry.digest.as_str(), HELLO_SHA256);
    assert_eq!(store.len(), 1);
    assert_eq!(store.status_snapshot().total_hashed, 2);
}

#[test]
fn test_scan_single_file_root() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("only.txt");
    fs::write(&path, "hello").unwrap();

    let store = HashStore::new();
    walker(&path, Algorithm::Sha256).scan_into(&store);

    assert_eq!(store.get(&path).unwrap().digest.as_str(), HELLO_SHA256);
}
