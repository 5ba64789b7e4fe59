//! Leaderboard operations over user score records.
//!
//! Each user is one record under the key `user_<id>`. Score submissions
//! are read-modify-write transactions retried on conflict, so concurrent
//! submissions against the same user serialize cleanly instead of losing
//! updates. Standings are a reporting scan over committed heads; they run
//! outside any transaction and never block writers.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use versa_concurrency::{CommitOutcome, TransactionManager};
use versa_core::error::{Error, Result};
use versa_core::types::Key;
use versa_core::Value;

use crate::database::run_with_retry;
use crate::retry::RetryConfig;

// ============================================================================
// ScoreRow
// ============================================================================

/// One user's leaderboard entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    /// User identifier; the record key is derived from it.
    pub user_id: u64,
    /// Current score. Deltas may be negative, so may the total.
    pub score: i64,
    /// When the score last changed, as `YYYY-MM-DD HH:MM:SS`.
    pub last_submission: String,
}

impl ScoreRow {
    /// Create a row.
    pub fn new(user_id: u64, score: i64, last_submission: impl Into<String>) -> Self {
        ScoreRow {
            user_id,
            score,
            last_submission: last_submission.into(),
        }
    }

    /// The store key for a user id.
    pub fn key_for(user_id: u64) -> Key {
        Key::from(format!("user_{}", user_id))
    }

    /// The store key for this row.
    pub fn key(&self) -> Key {
        Self::key_for(self.user_id)
    }

    /// Encode as a record value.
    pub fn to_value(&self) -> Value {
        Value::record([
            ("user_id", Value::Int(self.user_id as i64)),
            ("score", Value::Int(self.score)),
            (
                "last_submission",
                Value::String(self.last_submission.clone()),
            ),
        ])
    }

    /// Decode from a record value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let id = int_field(value, "user_id")?;
        let user_id = u64::try_from(id).map_err(|_| Error::WrongType {
            expected: "non-negative int field user_id".to_string(),
            actual: id.to_string(),
        })?;
        Ok(ScoreRow {
            user_id,
            score: int_field(value, "score")?,
            last_submission: str_field(value, "last_submission")?,
        })
    }
}

fn int_field(record: &Value, name: &str) -> Result<i64> {
    match record.field(name) {
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => Err(Error::WrongType {
            expected: format!("int field {}", name),
            actual: other.type_name().to_string(),
        }),
        None => Err(Error::WrongType {
            expected: format!("int field {}", name),
            actual: "missing".to_string(),
        }),
    }
}

fn str_field(record: &Value, name: &str) -> Result<String> {
    match record.field(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::WrongType {
            expected: format!("string field {}", name),
            actual: other.type_name().to_string(),
        }),
        None => Err(Error::WrongType {
            expected: format!("string field {}", name),
            actual: "missing".to_string(),
        }),
    }
}

// ============================================================================
// Standings
// ============================================================================

/// A ranked snapshot of the leaderboard.
///
/// Rows are ordered by score descending, ties broken by user id ascending
/// so equal scores render deterministically. The `Display` impl is the
/// renderer; nothing in the transaction core ever prints.
#[derive(Debug, Clone, PartialEq)]
pub struct Standings {
    rows: Vec<ScoreRow>,
}

impl Standings {
    /// Rows in rank order.
    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    /// Number of ranked users.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the board is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 1-based rank of a user, if present.
    pub fn rank_of(&self, user_id: u64) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.user_id == user_id)
            .map(|i| i + 1)
    }

    /// Iterate `(rank, row)` pairs, ranks starting at 1.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ScoreRow)> {
        self.rows.iter().enumerate().map(|(i, row)| (i + 1, row))
    }
}

impl std::fmt::Display for Standings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (rank, row) in self.iter() {
            writeln!(f, "Rank {}: User {} - Score {}", rank, row.user_id, row.score)?;
        }
        Ok(())
    }
}

// ============================================================================
// Leaderboard
// ============================================================================

/// Leaderboard access over one database.
///
/// Obtained as the `leaderboard` field of [`crate::Versa`].
pub struct Leaderboard {
    inner: Arc<TransactionManager>,
    retry: RetryConfig,
}

impl Leaderboard {
    pub(crate) fn new(inner: Arc<TransactionManager>, retry: RetryConfig) -> Self {
        Leaderboard { inner, retry }
    }

    /// Load initial rows, one transaction per row.
    ///
    /// Loading writes blindly and never reads, so it cannot conflict with
    /// itself; a conflict here means something else is writing user keys
    /// during the load and is reported as an internal error.
    pub fn load_rows(&self, rows: &[ScoreRow]) -> Result<usize> {
        for row in rows {
            let tid = self.inner.begin();
            self.inner.write(tid, row.key(), row.to_value())?;
            match self.inner.commit(tid)? {
                CommitOutcome::Committed { .. } => {
                    tracing::debug!(user_id = row.user_id, score = row.score, "loaded row");
                }
                CommitOutcome::Conflict { validation } => {
                    return Err(Error::Internal(format!(
                        "initial load conflicted: {}",
                        validation
                    )));
                }
            }
        }
        tracing::info!(users = rows.len(), "initial leaderboard loaded");
        Ok(rows.len())
    }

    /// Load initial rows from a JSON array of score records.
    pub fn load_json(&self, json: &str) -> Result<usize> {
        let rows: Vec<ScoreRow> = serde_json::from_str(json)
            .map_err(|e| Error::Internal(format!("invalid leaderboard json: {}", e)))?;
        self.load_rows(&rows)
    }

    /// Apply a score delta for a user, retrying on conflict.
    ///
    /// Runs read-modify-write in a transaction: reads the current row,
    /// adds the delta, stamps the submission time, writes the row back.
    /// Every attempt re-reads, so the delta always lands on the latest
    /// committed score. Returns the new score; a user with no row is
    /// [`Error::NotFound`], which is not retried.
    pub fn submit_score(&self, user_id: u64, delta: i64) -> Result<i64> {
        let key = ScoreRow::key_for(user_id);
        let new_score = run_with_retry(&self.inner, &self.retry, |txn| {
            let current = txn
                .get(key.clone())?
                .ok_or_else(|| Error::NotFound(key.to_string()))?;
            let mut row = ScoreRow::from_value(&current)?;
            row.score += delta;
            row.last_submission = submission_timestamp();
            txn.put(key.clone(), row.to_value())?;
            Ok(row.score)
        })?;
        tracing::info!(user_id, delta, new_score, "score submitted");
        Ok(new_score)
    }

    /// The current row for a user, read from the committed head.
    pub fn get(&self, user_id: u64) -> Result<Option<ScoreRow>> {
        match self.inner.store().head(&ScoreRow::key_for(user_id)) {
            None => Ok(None),
            Some(version) => ScoreRow::from_value(version.value()).map(Some),
        }
    }

    /// Rank every user by committed score.
    ///
    /// Malformed rows (keys in the user range that do not decode) are
    /// skipped with a warning rather than failing the whole scan.
    pub fn standings(&self) -> Standings {
        let mut rows = Vec::new();
        for (key, value) in self.inner.store().latest() {
            if !key.as_str().starts_with("user_") {
                continue;
            }
            match ScoreRow::from_value(&value) {
                Ok(row) => rows.push(row),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "skipping malformed row")
                }
            }
        }
        rows.sort_by(|a, b| b.score.cmp(&a.score).then(a.user_id.cmp(&b.user_id)));
        Standings { rows }
    }
}

fn submission_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
