//! Unified error types for Versa.
//!
//! This is the canonical error type for all Versa operations. Conflicts
//! detected at commit time are not errors: `commit` reports them through its
//! structured outcome. The `Conflict` variant exists for the closure and
//! retry layers, which classify a rejected commit as a retryable failure.

use crate::types::TxnId;
use thiserror::Error;

/// All Versa errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Operating on a transaction id that is not Active
    /// (already committed, aborted, mid-validation, or unknown).
    #[error("invalid transaction {id}: {state}")]
    InvalidTransaction {
        /// Offending transaction id
        id: TxnId,
        /// State the transaction was found in ("unknown" if never seen)
        state: String,
    },

    /// Commit rejected by validation (retryable with a fresh transaction)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Bounded retry loop gave up
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Total attempts made, including the first
        attempts: u32,
        /// Description of the last failure
        last: String,
    },

    /// Entity required by a collaborator was absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Wrong type for operation
    #[error("wrong type: expected {expected}, got {actual}")]
    WrongType {
        /// Expected type
        expected: String,
        /// Actual type found
        actual: String,
    },

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for Versa operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Retryable errors (conflicts) may succeed on retry with fresh data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}
