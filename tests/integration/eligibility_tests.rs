use fhashd::scanner::eligibility::split_device;
use fhashd::scanner::{Algorithm, BlockDeviceRegistry, EligibilityPolicy, Hasher, Walker};
use fhashd::store::HashStore;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

/// Registry that knows every device except the one holding `excluded`.
struct ExcludeSubtree(std::path::PathBuf);

impl EligibilityPolicy for ExcludeSubtree {
    fn is_block_backed(&self, dir: &Path) -> bool {
        !dir.starts_with(&self.0)
    }

    fn name(&self) -> &'static str {
        "exclude-subtree"
    }
}

#[test]
fn test_ineligible_subtree_leaves_no_trace() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("real.txt"), "real").unwrap();
    let pseudo = dir.path().join("dev");
    fs::create_dir_all(pseudo.join("nested")).unwrap();
    fs::write(pseudo.join("zero"), "hazard").unwrap();
    fs::write(pseudo.join("nested").join("null"), "hazard").unwrap();

    let store = HashStore::new();
    let w = Walker::new(
        dir.path(),
        Arc::new(ExcludeSubtree(pseudo.clone())),
        Hasher::new(Algorithm::Sha256),
    );
    w.scan_into(&store);

    assert_eq!(store.len(), 1);
    assert!(store.entries().iter().all(|(p, _)| !p.starts_with(&pseudo)));
    let status = store.status_snapshot();
    assert_eq!(status.total_handled, 1);
    assert_eq!(status.total_hashed, 1);
}

#[cfg(unix)]
#[test]
fn test_registry_policy_gates_scan() {
    use std::os::unix::fs::MetadataExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    let registry = tempdir().unwrap();
    let policy = Arc::new(BlockDeviceRegistry::new(registry.path()));

    // Device not registered: nothing is scanned or counted
    let store = HashStore::new();
    Walker::new(dir.path(), policy.clone(), Hasher::new(Algorithm::Sha256)).scan_into(&store);
    assert!(store.is_empty());
    assert_eq!(store.status_snapshot().total_handled, 0);

    // Register the device and scan again
    let (major, minor) = split_device(fs::metadata(dir.path()).unwrap().dev());
    fs::create_dir(registry.path().join(format!("{major}:{minor}"))).unwrap();
    Walker::new(dir.path(), policy, Hasher::new(Algorithm::Sha256)).scan_into(&store);
    assert_eq!(store.len(), 1);
}
