//! Public types for the Versa unified API.
//!
//! This module re-exports types from internal crates with a clean public interface.

// Core value and identifier types
pub use versa_core::types::{ConcurrencyPolicy, Key, Timestamp, TxnId};
pub use versa_core::Value;

// Error handling
pub use versa_core::{Error, Result};

// Versioned storage
pub use versa_storage::{Version, VersionStamp, VersionStore};

// Transaction machinery
pub use versa_concurrency::{
    CommitLog, CommitOutcome, Conflict, ConflictType, Observation, TransactionManager,
    TransactionMetrics, TransactionStatus, ValidationResult,
};
