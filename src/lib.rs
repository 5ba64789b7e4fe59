//! # Versa
//!
//! In-memory keyed record store with optimistic transaction control.
//!
//! Versa lets concurrent transactions read and update shared records
//! without holding record locks: reads are tracked, writes are buffered,
//! and commits validate the read set against current state in one atomic
//! step. Two concurrency policies are available, picked at construction:
//!
//! - **Snapshot** (default) - per-key version chains; each transaction
//!   reads a fixed point in commit history and conflicts are detected by
//!   version identity (first committer wins)
//! - **Flat** - a single current value per key, conflicts detected by
//!   content equality
//!
//! ## Quick Start
//!
//! ```ignore
//! use versadb::prelude::*;
//!
//! let db = Versa::new();
//!
//! // Load initial scores
//! db.leaderboard.load_rows(&[
//!     ScoreRow::new(1, 100, "2024-01-01"),
//!     ScoreRow::new(2, 200, "2024-01-01"),
//! ])?;
//!
//! // Concurrent submissions retry on conflict; no update is ever lost
//! db.leaderboard.submit_score(1, 50)?;
//!
//! // Ranked reporting over committed state
//! println!("{}", db.leaderboard.standings());
//! ```
//!
//! ## Transactions
//!
//! The closure runners cover most uses:
//!
//! 1. **One shot** - `db.transaction(|txn| ...)`; a conflict surfaces as
//!    [`Error::Conflict`]
//! 2. **Retrying** - `db.transaction_with_retry(|txn| ...)`; conflicted
//!    attempts re-run against fresh state with capped exponential backoff
//! 3. **Manual** - `db.begin()` returns a [`Txn`] handle whose
//!    `commit()` reports a structured [`CommitOutcome`]

#![warn(missing_docs)]

mod database;
mod leaderboard;
mod retry;
mod types;

pub mod prelude;

// Re-export main entry points
pub use database::{DatabaseMetrics, Txn, Versa, VersaBuilder};
pub use leaderboard::{Leaderboard, ScoreRow, Standings};
pub use retry::RetryConfig;

// Re-export types
pub use types::*;
