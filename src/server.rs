//! Read-only HTTP query endpoint.
//!
//! Routes:
//!
//! - `GET /fhash?fl=<path>` → `["<digest>", "<algorithm>"]`, or `""` when the
//!   path is unknown
//! - `GET /status` → the five counters
//! - anything else → `404`
//!
//! The server runs on its own thread with its own tokio runtime, so hashing
//! never shares a thread with request handling. It stops gracefully once the
//! shared shutdown flag is raised.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::store::{HashStore, StatusSnapshot};

/// How often the server checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Errors raised while starting or running the endpoint.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The async runtime could not be created.
    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The server loop failed.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    /// The server thread panicked.
    #[error("Server thread panicked")]
    Panicked,
}

/// Query string of `/fhash`.
#[derive(Debug, Deserialize)]
pub struct FhashQuery {
    /// Absolute path to look up
    pub fl: Option<String>,
}

/// Build the endpoint's router over a shared store.
pub fn router(store: Arc<HashStore>) -> Router {
    Router::new()
        .route("/fhash", get(fhash))
        .route("/status", get(status))
        .fallback(not_found)
        .with_state(store)
}

async fn fhash(
    State(store): State<Arc<HashStore>>,
    Query(query): Query<FhashQuery>,
) -> Json<Value> {
    let entry = query.fl.and_then(|path| store.get(Path::new(&path)));
    match entry {
        Some(entry) => Json(json!([entry.digest.as_str(), entry.algorithm.name()])),
        None => Json(json!("")),
    }
}

async fn status(State(store): State<Arc<HashStore>>) -> Json<StatusSnapshot> {
    Json(store.status_snapshot())
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Running endpoint.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    thread: JoinHandle<Result<(), ServerError>>,
}

impl ServerHandle {
    /// Address actually bound (useful with port 0).
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server thread to finish.
    ///
    /// # Errors
    ///
    /// Returns the error the server loop ended with, or
    /// [`ServerError::Panicked`].
    pub fn join(self) -> Result<(), ServerError> {
        self.thread.join().map_err(|_| ServerError::Panicked)?
    }
}

/// Bind `addr` and serve on a dedicated thread until `shutdown` is set.
///
/// Binding happens before this returns, so an unavailable port is reported
/// to the caller.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub fn spawn(
    addr: SocketAddr,
    store: Arc<HashStore>,
    shutdown: Arc<AtomicBool>,
) -> Result<ServerHandle, ServerError> {
    let listener = std::net::TcpListener::bind(addr)
        .and_then(|l| l.set_nonblocking(true).map(|()| l))
        .map_err(|source| ServerError::Bind { addr, source })?;
    let bound = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;

    let thread = std::thread::Builder::new()
        .name("fhashd-query".into())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .map_err(ServerError::Runtime)?;

            runtime.block_on(async move {
                let listener =
                    tokio::net::TcpListener::from_std(listener).map_err(ServerError::Serve)?;
                log::info!("Query endpoint listening on {}", bound);
                axum::serve(listener, router(store))
                    .with_graceful_shutdown(wait_for_flag(shutdown))
                    .await
                    .map_err(ServerError::Serve)?;
                log::info!("Query endpoint stopped");
                Ok(())
            })
        })
        .map_err(ServerError::Runtime)?;

    Ok(ServerHandle {
        addr: bound,
        thread,
    })
}

async fn wait_for_flag(flag: Arc<AtomicBool>) {
    let mut ticker = tokio::time::interval(SHUTDOWN_POLL);
    while !flag.load(Ordering::SeqCst) {
        ticker.tick().await;
    }
}
