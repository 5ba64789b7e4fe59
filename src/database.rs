//! Main database entry point for Versa.
//!
//! This module provides the `Versa` struct, the primary entry point for
//! transactional reads and writes, plus the closure-based transaction
//! runners with conflict retry.

use std::sync::Arc;
use std::time::Duration;

use versa_concurrency::{CommitOutcome, TransactionManager};
use versa_core::error::{Error, Result};
use versa_core::types::{ConcurrencyPolicy, Key, Timestamp, TxnId};
use versa_core::Value;

use crate::leaderboard::Leaderboard;
use crate::retry::RetryConfig;

/// The Versa database.
///
/// An in-memory keyed record store where every access runs inside an
/// optimistic transaction. Create one with [`Versa::new`] for snapshot
/// isolation, or [`Versa::builder`] to pick the concurrency policy and
/// retry behavior.
///
/// # Example
///
/// ```ignore
/// use versadb::prelude::*;
///
/// let db = Versa::new();
///
/// db.transaction(|txn| {
///     txn.put("user_1", Value::Int(100))?;
///     Ok(())
/// })?;
///
/// let score = db.transaction(|txn| txn.get("user_1"))?;
/// ```
pub struct Versa {
    /// The underlying transaction manager.
    pub(crate) inner: Arc<TransactionManager>,

    /// Backoff applied by [`Versa::transaction_with_retry`].
    retry: RetryConfig,

    /// Leaderboard operations over user score records.
    pub leaderboard: Leaderboard,
}

impl Versa {
    /// Create a database under snapshot isolation with default retry.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for database configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let db = Versa::builder()
    ///     .flat()
    ///     .retry(RetryConfig { max_retries: 5, ..RetryConfig::default() })
    ///     .build();
    /// ```
    pub fn builder() -> VersaBuilder {
        VersaBuilder::new()
    }

    /// The concurrency policy this database validates under.
    pub fn policy(&self) -> ConcurrencyPolicy {
        self.inner.policy()
    }

    /// Current logical time: the number of committed transactions.
    pub fn now(&self) -> Timestamp {
        self.inner.now()
    }

    /// The underlying transaction manager, for direct transaction control
    /// and store introspection.
    pub fn manager(&self) -> &TransactionManager {
        &self.inner
    }

    /// Start a transaction and return a handle for manual control.
    ///
    /// Prefer [`Versa::transaction`] unless the caller needs to hold a
    /// transaction open across its own control flow.
    pub fn begin(&self) -> Txn<'_> {
        Txn {
            manager: &self.inner,
            id: self.inner.begin(),
        }
    }

    /// Run a closure inside a transaction and commit it, once.
    ///
    /// The closure's writes are buffered and applied atomically at commit.
    /// If the closure errors the transaction is rolled back and the error
    /// propagates. A validation conflict surfaces as [`Error::Conflict`];
    /// the caller decides whether to retry.
    pub fn transaction<T>(&self, mut f: impl FnMut(&Txn<'_>) -> Result<T>) -> Result<T> {
        run_transaction(&self.inner, &mut f)
    }

    /// Run a closure inside a transaction, retrying on conflict.
    ///
    /// Each attempt runs in a fresh transaction with a fresh snapshot, so
    /// the closure re-reads current state. Backoff between attempts comes
    /// from this database's [`RetryConfig`]. Non-conflict errors propagate
    /// immediately; exhausting the attempts yields
    /// [`Error::RetryExhausted`].
    pub fn transaction_with_retry<T>(
        &self,
        f: impl FnMut(&Txn<'_>) -> Result<T>,
    ) -> Result<T> {
        run_with_retry(&self.inner, &self.retry, f)
    }

    /// Get database metrics.
    pub fn metrics(&self) -> DatabaseMetrics {
        let txn_metrics = self.inner.metrics();
        DatabaseMetrics {
            transactions_started: txn_metrics.started,
            transactions_committed: txn_metrics.committed,
            transactions_aborted: txn_metrics.aborted,
            transactions_active: txn_metrics.active as u64,
            commit_rate: txn_metrics.commit_rate(),
            operations: txn_metrics.committed + txn_metrics.aborted,
        }
    }
}

impl Default for Versa {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Versa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Versa")
            .field("policy", &self.policy())
            .field("commits", &self.now())
            .finish()
    }
}

// ============================================================================
// Transaction handle
// ============================================================================

/// Handle to one open transaction.
///
/// Reads and writes go through the handle; committing consumes it, so a
/// finished transaction cannot be touched again through this path. Inside
/// [`Versa::transaction`] closures the handle is borrowed and the runner
/// owns the commit.
pub struct Txn<'a> {
    manager: &'a TransactionManager,
    id: TxnId,
}

impl Txn<'_> {
    /// This transaction's identifier.
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Read a key as of this transaction's snapshot.
    ///
    /// Own buffered writes win; otherwise the first read of a key is
    /// recorded and later reads repeat it. Returns `None` for a key with
    /// no committed value, which is an answer, not an error.
    pub fn get(&self, key: impl Into<Key>) -> Result<Option<Value>> {
        self.manager.read(self.id, &key.into())
    }

    /// Buffer a write, visible to this transaction immediately and to
    /// others only after commit.
    pub fn put(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        self.manager.write(self.id, key.into(), value.into())
    }

    /// Validate and apply this transaction.
    pub fn commit(self) -> Result<CommitOutcome> {
        self.manager.commit(self.id)
    }

    /// Roll this transaction back.
    pub fn abort(self, reason: impl Into<String>) -> Result<()> {
        self.manager.abort(self.id, reason)
    }
}

impl std::fmt::Debug for Txn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Txn").field("id", &self.id).finish()
    }
}

// ============================================================================
// Transaction runners
// ============================================================================

/// One attempt: begin, run the closure, commit or roll back.
pub(crate) fn run_transaction<T>(
    manager: &TransactionManager,
    f: &mut impl FnMut(&Txn<'_>) -> Result<T>,
) -> Result<T> {
    let txn = Txn {
        manager,
        id: manager.begin(),
    };
    let value = match f(&txn) {
        Ok(value) => value,
        Err(err) => {
            let _ = manager.abort(txn.id, err.to_string());
            return Err(err);
        }
    };
    match manager.commit(txn.id)? {
        CommitOutcome::Committed { .. } => Ok(value),
        CommitOutcome::Conflict { validation } => Err(Error::Conflict(validation.to_string())),
    }
}

/// Attempt loop around [`run_transaction`] with backoff between conflicts.
pub(crate) fn run_with_retry<T>(
    manager: &TransactionManager,
    retry: &RetryConfig,
    mut f: impl FnMut(&Txn<'_>) -> Result<T>,
) -> Result<T> {
    let mut last_conflict = None;
    for attempt in 0..retry.max_attempts() {
        match run_transaction(manager, &mut f) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_conflict() => {
                if attempt + 1 < retry.max_attempts() {
                    let delay = retry.delay_for(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "conflict, backing off before retry"
                    );
                    sleep(delay);
                }
                last_conflict = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(Error::RetryExhausted {
        attempts: retry.max_attempts(),
        last: last_conflict
            .map(|e| e.to_string())
            .unwrap_or_else(|| "conflict".to_string()),
    })
}

fn sleep(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Database metrics.
#[derive(Debug, Clone)]
pub struct DatabaseMetrics {
    /// Total transactions begun
    pub transactions_started: u64,
    /// Total committed transactions
    pub transactions_committed: u64,
    /// Total aborted transactions
    pub transactions_aborted: u64,
    /// Currently active transactions
    pub transactions_active: u64,
    /// Commit success rate (0.0 - 1.0)
    pub commit_rate: f64,
    /// Total operations (commits + aborts)
    pub operations: u64,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for database configuration.
///
/// # Example
///
/// ```ignore
/// // snapshot isolation, default backoff
/// let db = Versa::builder().build();
///
/// // flat content-equality validation, no retries
/// let db = Versa::builder().flat().no_retry().build();
/// ```
pub struct VersaBuilder {
    policy: ConcurrencyPolicy,
    retry: RetryConfig,
}

impl VersaBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        VersaBuilder {
            policy: ConcurrencyPolicy::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Select the concurrency policy.
    pub fn policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use the flat single-version policy: validation compares values by
    /// content, with no history kept.
    pub fn flat(self) -> Self {
        self.policy(ConcurrencyPolicy::Flat)
    }

    /// Use the multi-version snapshot-isolation policy (the default).
    pub fn snapshot(self) -> Self {
        self.policy(ConcurrencyPolicy::Snapshot)
    }

    /// Set the backoff policy for [`Versa::transaction_with_retry`].
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Conflicts surface immediately instead of retrying.
    pub fn no_retry(self) -> Self {
        self.retry(RetryConfig::none())
    }

    /// Build the database.
    pub fn build(self) -> Versa {
        let inner = Arc::new(TransactionManager::new(self.policy));
        Versa {
            leaderboard: Leaderboard::new(Arc::clone(&inner), self.retry),
            inner,
            retry: self.retry,
        }
    }
}

impl Default for VersaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
