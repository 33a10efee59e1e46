//! Daemon configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `config.toml` in the platform config dir)
//! 3. `FHASHD_*` environment variables (e.g. `FHASHD_BIND=0.0.0.0:9843`)
//! 4. CLI flags, applied by [`Config::apply_run_args`]
//!
//! # Example
//!
//! ```toml
//! cache_path = "/var/lib/fhashd/fhash.db"
//! scan_root = "/"
//! bind = "127.0.0.1:9843"
//! algorithm = "sha256"
//! watch = true
//! block_registry = "/sys/dev/block"
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::cli::RunArgs;
use crate::scanner::{Algorithm, DEFAULT_BLOCK_REGISTRY};

/// Default address of the query endpoint.
pub const DEFAULT_BIND: &str = "127.0.0.1:9843";

/// Errors raised while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer contained an invalid value.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot database location.
    pub cache_path: PathBuf,
    /// Directory scanned when no snapshot exists.
    pub scan_root: PathBuf,
    /// Address for the query endpoint.
    pub bind: SocketAddr,
    /// Digest algorithm for this deployment.
    pub algorithm: Algorithm,
    /// Run the advisory change watcher.
    pub watch: bool,
    /// Block-device registry directory.
    pub block_registry: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            scan_root: PathBuf::from("/"),
            bind: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 9843))),
            algorithm: Algorithm::default(),
            watch: true,
            block_registry: PathBuf::from(DEFAULT_BLOCK_REGISTRY),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the config file and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when `explicit` names a missing
    /// file, and [`ConfigError::Invalid`] when any layer fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path().filter(|p| p.is_file()),
        };

        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = &file {
            log::debug!("Loading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("FHASHD_"));

        figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Apply `run` subcommand flags on top of loaded settings.
    pub fn apply_run_args(&mut self, args: &RunArgs) {
        if let Some(cache) = &args.cache {
            self.cache_path.clone_from(cache);
        }
        if let Some(root) = &args.root {
            self.scan_root.clone_from(root);
        }
        if let Some(bind) = args.bind {
            self.bind = bind;
        }
        if let Some(algorithm) = args.algorithm {
            self.algorithm = algorithm;
        }
        if args.no_watch {
            self.watch = false;
        }
    }

    /// Get the default platform-specific configuration path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "fhashd", "fhashd").map(|d| d.config_dir().join("config.toml"))
    }
}

fn default_cache_path() -> PathBuf {
    ProjectDirs::from("org", "fhashd", "fhashd")
        .map(|d| d.cache_dir().join("fhash.db"))
        .unwrap_or_else(|| PathBuf::from("fhash.db"))
}
