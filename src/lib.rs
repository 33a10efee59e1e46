//! fhashd - Filesystem Integrity Daemon
//!
//! Keeps a trustworthy map from paths on block-device-backed mounts to
//! content digests, persists it as an SQLite snapshot, and answers lookups
//! over HTTP so a filesystem tree can be checked for tampering over time.
//!
//! # Threads
//!
//! `fhashd run` uses one thread per concern: the startup scan or snapshot
//! load, the query endpoint (its own tokio runtime), and the advisory change
//! watcher. They share one [`store::HashStore`] and one shutdown flag.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod scanner;
pub mod server;
pub mod signal;
pub mod store;
pub mod watcher;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::CacheOutcome;
use crate::cli::{Cli, Commands, RunArgs, ScanArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::scanner::{select_policy, EligibilityPolicy, Hasher, PermissiveEligibility, Walker};
use crate::signal::ShutdownHandler;
use crate::store::HashStore;

/// How often the main thread checks for shutdown while the daemon runs.
const MAIN_POLL: Duration = Duration::from_millis(250);

/// Main application logic.
///
/// # Errors
///
/// Returns an error only for startup failures: invalid configuration, an
/// unavailable listen address, or a signal handler that cannot be installed.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let shutdown = signal::install_handler().context("Failed to install signal handler")?;

    match cli.command {
        Commands::Run(args) => run_daemon(config, &args, &shutdown),
        Commands::Scan(args) => run_scan(&config, &args, &shutdown),
    }
}

/// Build or load the snapshot, then serve until shutdown.
fn run_daemon(mut config: Config, args: &RunArgs, shutdown: &ShutdownHandler) -> Result<ExitCode> {
    config.apply_run_args(args);
    log::info!(
        "Starting: root={} cache={} algorithm={}",
        config.scan_root.display(),
        config.cache_path.display(),
        config.algorithm
    );

    let store = Arc::new(HashStore::new());
    let policy: Arc<dyn EligibilityPolicy> = Arc::from(select_policy(&config.block_registry));
    log::debug!("Eligibility policy: {}", policy.name());

    let server = server::spawn(config.bind, Arc::clone(&store), shutdown.get_flag())
        .context("Failed to start query endpoint")?;

    let bootstrap = {
        let store = Arc::clone(&store);
        let walker = Walker::new(&config.scan_root, policy, Hasher::new(config.algorithm))
            .with_shutdown_flag(shutdown.get_flag());
        let location = config.cache_path.clone();
        std::thread::Builder::new()
            .name("fhashd-scan".into())
            .spawn(move || cache::bootstrap(&location, &store, &walker))
            .context("Failed to spawn scan thread")?
    };

    // Registering a recursive watch walks the tree, so it overlaps the scan
    let watcher = start_watcher(&config, shutdown);

    let outcome = match bootstrap.join() {
        Ok(outcome) => outcome,
        Err(_) => {
            log::error!("Scan thread panicked");
            CacheOutcome::Unavailable
        }
    };
    log::info!(
        "Startup finished ({:?}), {} entries, {:?}",
        outcome,
        store.len(),
        store.status_snapshot()
    );

    shutdown.wait(MAIN_POLL);
    log::info!("Shutting down");

    if let Some(handle) = watcher {
        handle.join();
    }
    server.join().context("Query endpoint failed")?;

    Ok(if outcome == CacheOutcome::Interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    })
}

/// Start the advisory watcher if enabled. Failure to start is not fatal.
fn start_watcher(config: &Config, shutdown: &ShutdownHandler) -> Option<watcher::WatcherHandle> {
    if !config.watch {
        return None;
    }
    match watcher::spawn(&config.scan_root, shutdown.get_flag()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::warn!("Change watcher disabled: {}", e);
            None
        }
    }
}

/// Scan one directory and print every record as a JSON line, then the
/// counters.
fn run_scan(config: &Config, args: &ScanArgs, shutdown: &ShutdownHandler) -> Result<ExitCode> {
    let policy: Arc<dyn EligibilityPolicy> = if args.permissive {
        Arc::new(PermissiveEligibility)
    } else {
        Arc::from(select_policy(&config.block_registry))
    };
    let algorithm = args.algorithm.unwrap_or(config.algorithm);
    let walker = Walker::new(&args.path, policy, Hasher::new(algorithm))
        .with_shutdown_flag(shutdown.get_flag());

    let store = HashStore::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for record in walker.walk(store.counters()) {
        let line = serde_json::json!({
            "path": record.path.to_string_lossy(),
            "digest": record.digest.as_str(),
            "algorithm": record.algorithm.name(),
            "ok": record.digest.is_hex(),
        });
        writeln!(out, "{line}").context("Failed to write record")?;
    }
    writeln!(
        out,
        "{}",
        serde_json::to_string(&store.status_snapshot()).context("Failed to encode status")?
    )
    .context("Failed to write status")?;

    Ok(if shutdown.is_shutdown_requested() {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    })
}
