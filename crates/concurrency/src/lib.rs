//! Concurrency layer for versa
//!
//! This crate implements optimistic transaction control with:
//! - TransactionContext: read-set and write-buffer tracking
//! - CommitLog: the append-only commit record doubling as the clock
//! - ValidationPolicy: flat (content equality) and snapshot (version
//!   identity) conflict detection
//! - TransactionManager: begin/read/write/commit/abort with an atomic
//!   validate-then-apply commit step
//!
//! Conflicts are reported as [`CommitOutcome::Conflict`], never as errors
//! and never as output: rendering is the caller's business.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod oracle;
pub mod transaction;
pub mod validation;

pub use manager::{CommitOutcome, TransactionManager, TransactionMetrics};
pub use oracle::CommitLog;
pub use transaction::{Observation, TransactionContext, TransactionStatus};
pub use validation::{
    policy_for, Conflict, ConflictType, FlatValidation, SnapshotValidation, ValidationPolicy,
    ValidationResult,
};
