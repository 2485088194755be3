//! Crate-wide error types.
//!
//! Per-entry I/O errors during discovery and hashing are swallowed at
//! their own task boundary (the file is just dropped from the result);
//! they never surface as a `CerebroError`. The variants here are the
//! terminal failure classes: a rejected deletion gate and an internal
//! invariant violation.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for fallible library operations.
#[derive(Debug, Error)]
pub enum CerebroError {
    /// The deletion gate refused to authorize a plan.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// An internal invariant was violated (e.g. a group of size < 2
    /// reached the decision stage). Should never happen in practice;
    /// surfaced rather than silently tolerated.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// Failed to write a report or script file.
    #[error("failed to write {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize a report to JSON.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Raised by [`crate::gate::DeletionGate::assert_allowed`] when a
/// deletion may not proceed. No filesystem mutation has occurred when
/// this is raised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("deletion blocked: validation mode is off")]
    ValidationModeRequired,

    #[error("deletion blocked: invalid or expired token")]
    InvalidToken,
}

pub type Result<T> = std::result::Result<T, CerebroError>;
