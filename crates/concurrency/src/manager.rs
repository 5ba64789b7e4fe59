//! Transaction manager: lifecycle, reads, and the atomic commit step
//!
//! The manager owns the version store, the commit log, and every live
//! transaction context. All transaction operations go through it.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Look up the context; reject unless Active
//! 2. Acquire the commit lock
//! 3. mark_validating()
//! 4. validate() against current store state (backward-looking)
//! 5. IF conflicts: mark_aborted(), return CommitOutcome::Conflict
//!    (no store mutation, no clock advance)
//! 6. commit_ts = commit log length
//! 7. apply every buffered write at commit_ts
//! 8. append to the commit log (the clock tick)
//! 9. mark_committed(), return CommitOutcome::Committed { commit_ts }
//! ```
//!
//! Steps 3-9 run under one lock. Validation checks committed history only,
//! not other transactions' pending writes, so two validations interleaved
//! against the same stale state would both pass and a lost update would
//! slip through. Holding the lock across validate-then-apply is what makes
//! the backward-looking check sound.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use versa_core::error::{Error, Result};
use versa_core::types::{ConcurrencyPolicy, Key, Timestamp, TxnId};
use versa_core::Value;
use versa_storage::VersionStore;

use crate::oracle::CommitLog;
use crate::transaction::{Observation, TransactionContext, TransactionStatus};
use crate::validation::{policy_for, ValidationPolicy, ValidationResult};

// ============================================================================
// Commit outcome
// ============================================================================

/// What `commit` decided.
///
/// A conflict is a normal outcome, not an error: the transaction was
/// cleanly rolled back and the caller may retry with a fresh one. Errors
/// are reserved for misuse (operating on a non-Active transaction).
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Writes applied, clock advanced.
    Committed {
        /// The logical time the writes became visible at.
        commit_ts: Timestamp,
    },
    /// Validation failed; nothing was applied and the clock did not move.
    Conflict {
        /// Every read-set entry that went stale.
        validation: ValidationResult,
    },
}

impl CommitOutcome {
    /// Whether the transaction committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }

    /// The commit timestamp, if committed.
    pub fn commit_ts(&self) -> Option<Timestamp> {
        match self {
            CommitOutcome::Committed { commit_ts } => Some(*commit_ts),
            CommitOutcome::Conflict { .. } => None,
        }
    }

    /// The conflict detail, if validation failed.
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            CommitOutcome::Committed { .. } => None,
            CommitOutcome::Conflict { validation } => Some(validation),
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Counters the manager keeps about transaction traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Transactions ever begun.
    pub started: u64,
    /// Transactions that committed.
    pub committed: u64,
    /// Transactions aborted, by conflict or explicitly.
    pub aborted: u64,
    /// Transactions currently Active.
    pub active: usize,
}

impl TransactionMetrics {
    /// Committed share of finished transactions, 0.0 when none finished.
    pub fn commit_rate(&self) -> f64 {
        let finished = self.committed + self.aborted;
        if finished == 0 {
            0.0
        } else {
            self.committed as f64 / finished as f64
        }
    }
}

// ============================================================================
// TransactionManager
// ============================================================================

/// Coordinates transactions over one version store.
///
/// # Thread Safety
///
/// Reads and writes of distinct transactions proceed concurrently; only
/// the commit step serializes. Lock order is always context shard, then
/// commit lock, then store shards, so the three layers cannot deadlock.
///
/// # Example
///
/// ```ignore
/// use versa_concurrency::TransactionManager;
/// use versa_core::types::ConcurrencyPolicy;
///
/// let manager = TransactionManager::new(ConcurrencyPolicy::Snapshot);
/// let tid = manager.begin();
/// manager.write(tid, "user_1".into(), 100.into())?;
/// let outcome = manager.commit(tid)?;
/// assert!(outcome.is_committed());
/// ```
pub struct TransactionManager {
    /// Committed state. Mutated only from inside the commit lock.
    store: VersionStore,
    /// Commit order and the logical clock.
    commit_log: CommitLog,
    /// Every context ever begun, terminal ones included.
    transactions: DashMap<TxnId, TransactionContext>,
    /// Next transaction id. Ids start at 1 and are never reused.
    next_txn_id: AtomicU64,
    /// Conflict-detection strategy matching the store's policy.
    validator: Box<dyn ValidationPolicy>,
    /// Commit serialization lock.
    ///
    /// Prevents the TOCTOU race between validation and apply. Without it:
    /// 1. T1 validates (passes, store unchanged)
    /// 2. T2 validates (passes, store still unchanged)
    /// 3. T1 applies
    /// 4. T2 applies over T1 using its stale validation
    /// Both commit and T1's update is lost.
    commit_lock: Mutex<()>,

    started: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
}

impl TransactionManager {
    /// Create a manager with an empty store under the given policy.
    pub fn new(policy: ConcurrencyPolicy) -> Self {
        TransactionManager {
            store: VersionStore::new(policy),
            commit_log: CommitLog::new(),
            transactions: DashMap::new(),
            next_txn_id: AtomicU64::new(1),
            validator: policy_for(policy),
            commit_lock: Mutex::new(()),
            started: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
        }
    }

    /// The store's concurrency policy.
    pub fn policy(&self) -> ConcurrencyPolicy {
        self.store.policy()
    }

    /// Committed state, for read-only scans outside any transaction.
    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    /// The commit log.
    pub fn commit_log(&self) -> &CommitLog {
        &self.commit_log
    }

    /// Current logical time.
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.commit_log.now()
    }

    // ========================================================================
    // Transaction operations
    // ========================================================================

    /// Start a transaction reading as of the current logical time.
    pub fn begin(&self) -> TxnId {
        let tid = TxnId::new(self.next_txn_id.fetch_add(1, Ordering::SeqCst));
        let begin_ts = self.commit_log.now();
        self.transactions
            .insert(tid, TransactionContext::new(tid, begin_ts));
        self.started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(txn_id = %tid, begin_ts, "transaction started");
        tid
    }

    /// Read a key within a transaction.
    ///
    /// Resolution order: the transaction's own buffered write, then its
    /// recorded observation, then the store as of `begin_ts`. The first
    /// store read of each key is recorded in the read set, absent keys
    /// included, so validation later catches concurrent commits even on
    /// keys this transaction only read. Returns a copy; mutating it does
    /// not touch stored state.
    pub fn read(&self, tid: TxnId, key: &Key) -> Result<Option<Value>> {
        let mut txn = self.context_mut(tid)?;
        txn.ensure_active()?;

        // read-your-writes: buffered values win and are not observations
        if let Some(pending) = txn.staged(key) {
            return Ok(Some(pending.clone()));
        }
        // repeated reads are served from the first observation
        if let Some(observation) = txn.observation(key) {
            return Ok(observation.value().cloned());
        }

        let begin_ts = txn.begin_ts();
        let found = self.store.read_as_of(key, begin_ts);
        let value = found.as_ref().map(|v| v.value().clone());
        let observation = match (self.store.policy(), found) {
            (_, None) => Observation::Missing,
            (ConcurrencyPolicy::Flat, Some(version)) => {
                Observation::Value(version.into_value())
            }
            (ConcurrencyPolicy::Snapshot, Some(version)) => Observation::Version(version),
        };
        txn.record_read(key.clone(), observation);
        Ok(value)
    }

    /// Buffer a write. Nothing reaches the store until commit; a later
    /// write to the same key in this transaction replaces the earlier one.
    pub fn write(&self, tid: TxnId, key: Key, value: Value) -> Result<()> {
        let mut txn = self.context_mut(tid)?;
        txn.ensure_active()?;
        txn.stage_write(key, value);
        Ok(())
    }

    /// Validate and, if clean, apply a transaction in one atomic step.
    ///
    /// Returns `Ok` for both outcomes; see [`CommitOutcome`]. A conflicted
    /// transaction ends Aborted with nothing applied and the clock
    /// untouched. Errors indicate misuse: the id is unknown or the
    /// transaction is not Active.
    pub fn commit(&self, tid: TxnId) -> Result<CommitOutcome> {
        let mut txn = self.context_mut(tid)?;
        txn.ensure_active()?;

        // Everything from validation to clock advance happens under this
        // lock; see the module doc for why the two cannot be separated.
        let _commit_guard = self.commit_lock.lock();

        txn.mark_validating()?;
        let current_ts = self.commit_log.now();
        let validation = self.validator.validate(&txn, &self.store, current_ts);

        if !validation.is_ok() {
            tracing::debug!(
                txn_id = %tid,
                policy = self.validator.name(),
                conflicts = validation.len(),
                "commit rejected: {}",
                validation
            );
            txn.mark_aborted(validation.to_string())?;
            self.aborted.fetch_add(1, Ordering::Relaxed);
            return Ok(CommitOutcome::Conflict { validation });
        }

        let commit_ts = current_ts;
        for (key, value) in txn.writes() {
            self.store.apply(key, value.clone(), commit_ts, tid);
        }
        self.commit_log.append(tid);
        txn.mark_committed()?;
        self.committed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            txn_id = %tid,
            commit_ts,
            writes = txn.write_count(),
            "transaction committed"
        );
        Ok(CommitOutcome::Committed { commit_ts })
    }

    /// Roll back an Active transaction. Its buffered writes are discarded
    /// and the clock does not move.
    pub fn abort(&self, tid: TxnId, reason: impl Into<String>) -> Result<()> {
        let mut txn = self.context_mut(tid)?;
        txn.mark_aborted(reason.into())?;
        self.aborted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(txn_id = %tid, "transaction aborted");
        Ok(())
    }

    /// Lifecycle state of a transaction, terminal ones included.
    pub fn status(&self, tid: TxnId) -> Option<TransactionStatus> {
        self.transactions.get(&tid).map(|txn| txn.status().clone())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Committed transaction ids in commit order.
    pub fn committed_ids(&self) -> Vec<TxnId> {
        self.commit_log.committed_ids()
    }

    /// Traffic counters.
    pub fn metrics(&self) -> TransactionMetrics {
        let active = self
            .transactions
            .iter()
            .filter(|entry| entry.value().status().is_active())
            .count();
        TransactionMetrics {
            started: self.started.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            active,
        }
    }

    fn context_mut(
        &self,
        tid: TxnId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, TxnId, TransactionContext>> {
        self.transactions
            .get_mut(&tid)
            .ok_or(Error::InvalidTransaction {
                id: tid,
                state: "unknown".to_string(),
            })
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("policy", &self.policy())
            .field("commits", &self.commit_log.len())
            .field("transactions", &self.transactions.len())
            .finish()
    }
}
