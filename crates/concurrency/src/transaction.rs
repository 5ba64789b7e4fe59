//! Per-transaction state: read set, write buffer, lifecycle
//!
//! A transaction never touches the store directly. Reads are recorded as
//! [`Observation`]s so validation can later detect any intervening change,
//! writes are buffered in the write set until commit, and the lifecycle is
//! a small state machine whose transitions are enforced here rather than
//! trusted to callers.
//!
//! # Lifecycle
//!
//! ```text
//! Active ──mark_validating()──> Validating ──mark_committed()──> Committed
//!   │                               │
//!   └────────mark_aborted()─────────┴──mark_aborted()──> Aborted { reason }
//! ```
//!
//! `Validating` only exists inside the committer's critical section; code
//! outside it observes Active, Committed, or Aborted.

use rustc_hash::FxHashMap;
use versa_core::error::{Error, Result};
use versa_core::types::{Key, Timestamp, TxnId};
use versa_core::Value;
use versa_storage::Version;

// ============================================================================
// Observation
// ============================================================================

/// What a transaction saw when it read a key.
///
/// The read set stores the exact observation, not just the key: validation
/// must be able to tell "the value I read is gone" apart from "the key I
/// probed was absent and still is." Absence is an observation too.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The key had never been written (or was not visible) at read time.
    Missing,
    /// Flat policy: the exact value read, compared by content at validation.
    Value(Value),
    /// Snapshot policy: the exact version read, compared by identity and
    /// interval at validation.
    Version(Version),
}

impl Observation {
    /// The value this observation carries, if any.
    ///
    /// Repeated reads of a key within one transaction are served from this,
    /// which is what keeps a transaction's view of a key stable no matter
    /// what commits elsewhere.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Observation::Missing => None,
            Observation::Value(v) => Some(v),
            Observation::Version(v) => Some(v.value()),
        }
    }

    /// Whether the key was absent when observed.
    pub fn is_missing(&self) -> bool {
        matches!(self, Observation::Missing)
    }
}

// ============================================================================
// TransactionStatus
// ============================================================================

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionStatus {
    /// Accepting reads and writes.
    Active,
    /// Inside the commit critical section, being validated.
    Validating,
    /// Validation passed and writes were applied. Terminal.
    Committed,
    /// Rolled back, either by conflict or explicitly. Terminal.
    Aborted {
        /// Why the transaction was rolled back.
        reason: String,
    },
}

impl TransactionStatus {
    /// Short state name used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "active",
            TransactionStatus::Validating => "validating",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Aborted { .. } => "aborted",
        }
    }

    /// Whether the transaction can still read and write.
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionStatus::Active)
    }

    /// Whether the transaction has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed | TransactionStatus::Aborted { .. }
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// TransactionContext
// ============================================================================

/// All mutable state owned by one transaction.
///
/// The context is plain data; it holds no locks and no store references.
/// The manager owns the map of live contexts and is the only code that
/// mutates them.
#[derive(Debug)]
pub struct TransactionContext {
    /// Unique, never reused.
    id: TxnId,
    /// Logical time captured at `begin`; fixed for the transaction's life.
    begin_ts: Timestamp,
    /// Exact observations per key, recorded on first read.
    read_set: FxHashMap<Key, Observation>,
    /// Pending writes, last write per key wins.
    write_set: FxHashMap<Key, Value>,
    status: TransactionStatus,
}

impl TransactionContext {
    /// Create an Active context with empty read and write sets.
    pub fn new(id: TxnId, begin_ts: Timestamp) -> Self {
        TransactionContext {
            id,
            begin_ts,
            read_set: FxHashMap::default(),
            write_set: FxHashMap::default(),
            status: TransactionStatus::Active,
        }
    }

    /// Transaction identifier.
    #[inline]
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// The logical time this transaction reads as of.
    #[inline]
    pub fn begin_ts(&self) -> Timestamp {
        self.begin_ts
    }

    /// Current lifecycle state.
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Fail fast unless the transaction is Active.
    pub fn ensure_active(&self) -> Result<()> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(Error::InvalidTransaction {
                id: self.id,
                state: self.status.name().to_string(),
            })
        }
    }

    // ========================================================================
    // Read and write sets
    // ========================================================================

    /// Record what a first read of `key` saw. Later reads of the same key
    /// are served from the recorded observation, so a second record for the
    /// same key is ignored.
    pub fn record_read(&mut self, key: Key, observation: Observation) {
        self.read_set.entry(key).or_insert(observation);
    }

    /// The recorded observation for a key, if it was ever read.
    pub fn observation(&self, key: &Key) -> Option<&Observation> {
        self.read_set.get(key)
    }

    /// Buffer a write. Overwrites any earlier buffered write to the same
    /// key; only the final value per key reaches the store at commit.
    pub fn stage_write(&mut self, key: Key, value: Value) {
        self.write_set.insert(key, value);
    }

    /// The pending write for a key, if one is buffered.
    pub fn staged(&self, key: &Key) -> Option<&Value> {
        self.write_set.get(key)
    }

    /// Iterate the recorded observations.
    pub fn reads(&self) -> impl Iterator<Item = (&Key, &Observation)> {
        self.read_set.iter()
    }

    /// Iterate the buffered writes.
    pub fn writes(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.write_set.iter()
    }

    /// Number of keys read.
    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }

    /// Number of keys with buffered writes.
    pub fn write_count(&self) -> usize {
        self.write_set.len()
    }

    /// Whether the transaction has nothing to apply at commit.
    pub fn is_read_only(&self) -> bool {
        self.write_set.is_empty()
    }

    // ========================================================================
    // State machine
    // ========================================================================

    /// Active → Validating. Only the committer calls this, under the
    /// commit lock.
    pub fn mark_validating(&mut self) -> Result<()> {
        match self.status {
            TransactionStatus::Active => {
                self.status = TransactionStatus::Validating;
                Ok(())
            }
            _ => Err(self.invalid_state()),
        }
    }

    /// Validating → Committed.
    pub fn mark_committed(&mut self) -> Result<()> {
        match self.status {
            TransactionStatus::Validating => {
                self.status = TransactionStatus::Committed;
                Ok(())
            }
            _ => Err(self.invalid_state()),
        }
    }

    /// Active or Validating → Aborted. Terminal states stay put.
    pub fn mark_aborted(&mut self, reason: String) -> Result<()> {
        match self.status {
            TransactionStatus::Active | TransactionStatus::Validating => {
                self.status = TransactionStatus::Aborted { reason };
                Ok(())
            }
            _ => Err(self.invalid_state()),
        }
    }

    fn invalid_state(&self) -> Error {
        Error::InvalidTransaction {
            id: self.id,
            state: self.status.name().to_string(),
        }
    }
}
