//! Convenient imports for Versa.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```ignore
//! use versadb::prelude::*;
//!
//! let db = Versa::new();
//! db.transaction(|txn| txn.put("user_1", 100i64))?;
//! ```

// Main entry point
pub use crate::database::{Txn, Versa, VersaBuilder};

// Error handling
pub use crate::types::{Error, Result};

// Transaction outcomes and retry policy
pub use crate::retry::RetryConfig;
pub use crate::types::{CommitOutcome, ConcurrencyPolicy, ValidationResult};

// Core types
pub use crate::types::{Key, Timestamp, TxnId, Value};

// Leaderboard collaborators
pub use crate::leaderboard::{Leaderboard, ScoreRow, Standings};
