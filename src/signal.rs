//! Cooperative shutdown on SIGINT/SIGTERM.
//!
//! A single [`ShutdownHandler`] wraps an `AtomicBool` that every long-running
//! part of the daemon polls: the tree scan checks it between entries, the
//! query endpoint waits on it for graceful shutdown, and the watcher checks
//! it between events. Nothing is torn down from outside a thread.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fhashd::signal::install_handler;
//! use std::time::Duration;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! let flag = handler.get_flag();
//! // hand `flag` to the walker, server and watcher...
//! handler.wait(Duration::from_millis(200));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Shared shutdown flag.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request shutdown, as a signal would.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the shutdown flag for passing to worker threads.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Block the calling thread until shutdown is requested, checking every
    /// `poll` interval.
    pub fn wait(&self, poll: Duration) {
        while !self.is_shutdown_requested() {
            std::thread::sleep(poll);
        }
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the signal handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install a SIGINT/SIGTERM handler that raises the shutdown flag.
///
/// Only one OS hook can exist per process; later calls return the handler
/// installed first.
///
/// # Errors
///
/// Returns [`SignalError`] if the OS hook cannot be registered.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        log::info!("Shutdown signal received");
    })?;

    Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone())
}
