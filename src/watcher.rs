//! Advisory filesystem change watcher.
//!
//! Watches the scan root recursively and reports file creations and
//! deletions. Reports are informational only: nothing is re-hashed and the
//! hash table is never touched from here.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// How long the watcher thread blocks before re-checking the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Errors raised while starting the watcher.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    /// The OS watch could not be created or registered.
    #[error("Failed to watch {path}: {source}")]
    Notify {
        /// Root being watched
        path: PathBuf,
        /// Underlying notify error
        #[source]
        source: notify::Error,
    },

    /// The watcher thread could not be spawned.
    #[error("Failed to spawn watcher thread: {0}")]
    Thread(#[source] std::io::Error),
}

/// Kind of change worth reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A path appeared
    Created,
    /// A path disappeared
    Removed,
}

/// One reported change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    /// What happened
    pub kind: ChangeKind,
    /// Where it happened
    pub path: PathBuf,
}

/// Turn a raw notify event into the changes we report.
///
/// Modifications, accesses and other events produce nothing.
#[must_use]
pub fn notices(event: &Event) -> Vec<ChangeNotice> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .map(|path| ChangeNotice {
            kind,
            path: path.clone(),
        })
        .collect()
}

fn log_notice(notice: ChangeNotice) {
    match notice.kind {
        ChangeKind::Created => log::info!("Created: {}", notice.path.display()),
        ChangeKind::Removed => log::info!("Deleted: {}", notice.path.display()),
    }
}

/// Running watcher thread.
#[derive(Debug)]
pub struct WatcherHandle {
    thread: JoinHandle<()>,
}

impl WatcherHandle {
    /// Wait for the watcher thread to exit.
    pub fn join(self) {
        if self.thread.join().is_err() {
            log::error!("Watcher thread panicked");
        }
    }
}

/// Watch `root` and log changes until `shutdown` is set.
///
/// # Errors
///
/// Returns [`WatchError`] if the watch cannot be registered.
pub fn spawn(root: &Path, shutdown: Arc<AtomicBool>) -> Result<WatcherHandle, WatchError> {
    spawn_with_sink(root, shutdown, log_notice)
}

/// Watch `root` and pass every change to `sink` until `shutdown` is set.
///
/// # Errors
///
/// Returns [`WatchError`] if the watch cannot be registered.
pub fn spawn_with_sink<F>(
    root: &Path,
    shutdown: Arc<AtomicBool>,
    sink: F,
) -> Result<WatcherHandle, WatchError>
where
    F: Fn(ChangeNotice) + Send + 'static,
{
    let notify_error = |source| WatchError::Notify {
        path: root.to_path_buf(),
        source,
    };

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(tx).map_err(notify_error)?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(notify_error)?;
    log::info!("Watching {} for changes", root.display());

    let thread = std::thread::Builder::new()
        .name("fhashd-watch".into())
        .spawn(move || {
            // Keep the OS watch alive for as long as this thread runs
            let _watcher = watcher;
            while !shutdown.load(Ordering::SeqCst) {
                match rx.recv_timeout(SHUTDOWN_POLL) {
                    Ok(Ok(event)) => notices(&event).into_iter().for_each(&sink),
                    Ok(Err(e)) => log::warn!("Watch error: {}", e),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            log::debug!("Watcher stopped");
        })
        .map_err(WatchError::Thread)?;

    Ok(WatcherHandle { thread })
}
