//! Structured error handling and exit codes.
//!
//! Nothing that happens inside the scanner, store or cache is fatal; those
//! layers absorb their errors into counters and logs. Only startup problems
//! (bad configuration, port in use, no permission) reach these exit codes.

use serde::Serialize;

/// Exit codes for the fhashd process.
///
/// - 0: Success (ran until shutdown or finished a one-shot scan)
/// - 1: General error (could not start)
/// - 130: Interrupted by signal before startup completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the command completed normally.
    Success = 0,
    /// General error: an unexpected startup failure occurred.
    GeneralError = 1,
    /// Interrupted: a signal stopped the initial scan.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "FH000",
            Self::GeneralError => "FH001",
            Self::Interrupted => "FH130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "FH001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
