//! Command-line interface definitions for fhashd.
//!
//! This module defines all CLI arguments and subcommands using the clap derive API.
//! Global options (verbosity, config file, error format) apply to every subcommand.
//! Values given here override the configuration file and `FHASHD_*` environment.
//!
//! # Example
//!
//! ```bash
//! # Run the daemon with the default configuration
//! fhashd run
//!
//! # Run against a custom snapshot and port
//! fhashd run --cache /var/lib/fhashd/fhash.db --bind 127.0.0.1:9843
//!
//! # One-shot scan of a directory, printing JSON lines
//! fhashd -v scan /data
//! ```

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::scanner::Algorithm;

/// Filesystem integrity daemon.
///
/// fhashd keeps a map from files on block-device-backed mounts to their
/// content digests, persists it to a snapshot, and serves lookups over HTTP.
#[derive(Debug, Parser)]
#[command(name = "fhashd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH", env = "FHASHD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print fatal errors as JSON
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for fhashd.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build or load the snapshot, then serve queries until signalled
    Run(RunArgs),
    /// Scan a directory once and print every record as JSON
    Scan(ScanArgs),
}

/// Arguments for the run subcommand.
#[derive(Debug, Args, Default)]
pub struct RunArgs {
    /// Path to the snapshot database
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Directory to scan when no snapshot exists
    #[arg(long, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Address for the query endpoint
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Digest algorithm (sha256, sha512, blake3)
    #[arg(long, value_name = "NAME")]
    pub algorithm: Option<Algorithm>,

    /// Disable the change watcher
    #[arg(long)]
    pub no_watch: bool,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory path to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Digest algorithm (sha256, sha512, blake3)
    #[arg(long, value_name = "NAME")]
    pub algorithm: Option<Algorithm>,

    /// Hash every directory, even when no block-device registry matches
    #[arg(long)]
    pub permissive: bool,
}
