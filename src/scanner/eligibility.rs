//! Decides which directories may be descended and which files may be hashed.
//!
//! # Overview
//!
//! Reading device nodes or pseudo-filesystem entries can block forever or
//! return unbounded data. The scanner therefore only descends directories
//! that live on a real block device, checked once per directory through an
//! [`EligibilityPolicy`], and only hashes regular files.
//!
//! # Platform Support
//!
//! - **Linux**: [`BlockDeviceRegistry`] looks up the directory's device
//!   number (`major:minor`) in `/sys/dev/block`.
//! - **Other**: no registry exists; [`PermissiveEligibility`] accepts every
//!   directory. This is a portability fallback, not a security property.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

/// Default location of the Linux block-device registry.
pub const DEFAULT_BLOCK_REGISTRY: &str = "/sys/dev/block";

/// Strategy deciding whether a directory is safe to descend.
pub trait EligibilityPolicy: Send + Sync {
    /// Whether `dir` resides on a present block device.
    fn is_block_backed(&self, dir: &Path) -> bool;

    /// Short policy name for logging.
    fn name(&self) -> &'static str;
}

/// Policy backed by a `major:minor` block-device registry directory.
#[derive(Debug, Clone)]
pub struct BlockDeviceRegistry {
    root: PathBuf,
}

impl BlockDeviceRegistry {
    /// Use the registry at `root` (normally `/sys/dev/block`).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Registry directory being consulted.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a device number has an entry in the registry.
    #[must_use]
    pub fn contains_device(&self, dev: u64) -> bool {
        let (major, minor) = split_device(dev);
        self.root.join(format!("{major}:{minor}")).exists()
    }
}

impl EligibilityPolicy for BlockDeviceRegistry {
    fn is_block_backed(&self, dir: &Path) -> bool {
        match std::fs::symlink_metadata(dir) {
            Ok(metadata) => match device_id(&metadata) {
                Some(dev) => self.contains_device(dev),
                None => false,
            },
            Err(e) => {
                log::debug!("Cannot stat {}: {}", dir.display(), e);
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "block-device-registry"
    }
}

/// Policy that accepts every directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveEligibility;

impl EligibilityPolicy for PermissiveEligibility {
    fn is_block_backed(&self, _dir: &Path) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "permissive"
    }
}

/// Pick the eligibility policy for this host.
///
/// Uses the registry at `registry_root` when it is a directory, and falls
/// back to [`PermissiveEligibility`] (with a warning) otherwise.
#[must_use]
pub fn select_policy(registry_root: &Path) -> Box<dyn EligibilityPolicy> {
    if cfg!(target_os = "linux") && registry_root.is_dir() {
        log::debug!("Using block-device registry at {}", registry_root.display());
        Box::new(BlockDeviceRegistry::new(registry_root))
    } else {
        log::warn!(
            "Platform unsupported: no block-device registry at {}, every directory is eligible",
            registry_root.display()
        );
        Box::new(PermissiveEligibility)
    }
}

/// Whether raw `st_mode` bits describe a regular file.
///
/// Directories, symlinks, character and block devices, FIFOs and sockets
/// are all rejected.
#[cfg(unix)]
#[must_use]
pub fn is_regular_file(mode: u32) -> bool {
    mode & (libc::S_IFMT as u32) == libc::S_IFREG as u32
}

/// Whether metadata (from `symlink_metadata`) describes a regular file.
#[must_use]
pub fn is_regular(metadata: &Metadata) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        is_regular_file(metadata.mode())
    }

    #[cfg(not(unix))]
    {
        metadata.file_type().is_file()
    }
}

/// Split a Linux `dev_t` into its major and minor numbers.
#[must_use]
pub fn split_device(dev: u64) -> (u64, u64) {
    let major = ((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff);
    let minor = ((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff);
    (major, minor)
}

#[cfg(unix)]
fn device_id(metadata: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.dev())
}

#[cfg(not(unix))]
fn device_id(_metadata: &Metadata) -> Option<u64> {
    None
}
