//! Core error types.

use thiserror::Error;

/// Errors surfaced by core operations.
///
/// The core never terminates on bad input: unknown ids degrade to silent
/// no-ops, and everything else is reported through these variants for the
/// UI boundary to translate into user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Operation rejected without any state change (e.g. deleting, cloning
    /// or transferring a group anchor directly).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Snapshot blob could not be decoded; the store is left untouched.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Snapshot serialization failed.
    #[error("snapshot encoding failed: {0}")]
    SnapshotEncode(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
