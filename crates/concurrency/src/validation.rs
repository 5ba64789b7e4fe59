//! Commit-time validation: the two conflict-detection strategies
//!
//! Both policies walk the transaction's read set and compare every
//! observation against the store's current state. They differ only in what
//! "changed since I looked" means:
//!
//! - [`FlatValidation`]: content equality. The current value must be
//!   identical to the value observed, with no notion of when it changed.
//!   Restoring a key to its observed value between read and validation
//!   passes (the classic ABA blind spot of value-based OCC).
//! - [`SnapshotValidation`]: version identity. The chain head must still
//!   be the exact version observed; a newer version, or closure of the
//!   observed one, is a conflict even if the value matches.
//!
//! Validation is backward-looking: it checks committed history, never the
//! pending write sets of other in-flight transactions. That is only sound
//! because the committer runs validate-then-apply as one critical section;
//! see the manager.

use versa_core::types::{ConcurrencyPolicy, Key, Timestamp};
use versa_storage::VersionStore;

use crate::transaction::{Observation, TransactionContext};

// ============================================================================
// Conflict reporting
// ============================================================================

/// Why a read-set entry failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictType {
    /// Flat policy: the key's current value differs from the one observed.
    ValueChanged,
    /// The key was absent when observed but has a committed value now.
    KeyAppeared,
    /// The key had a value when observed but has none now.
    KeyVanished,
    /// Snapshot policy: a newer version has been committed past the one
    /// observed.
    NewerVersion,
    /// Snapshot policy: the observed version's validity interval has been
    /// closed at or before the validation timestamp.
    VersionClosed,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ConflictType::ValueChanged => "value changed",
            ConflictType::KeyAppeared => "key appeared",
            ConflictType::KeyVanished => "key vanished",
            ConflictType::NewerVersion => "newer version committed",
            ConflictType::VersionClosed => "observed version closed",
        };
        f.write_str(text)
    }
}

/// One failed read-set entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The key whose observation went stale.
    pub key: Key,
    /// What changed underneath the transaction.
    pub conflict_type: ConflictType,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.key, self.conflict_type)
    }
}

/// Outcome of validating one transaction's read set.
///
/// Collects every stale entry rather than stopping at the first, so a
/// caller deciding whether to retry sees the full picture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    conflicts: Vec<Conflict>,
}

impl ValidationResult {
    /// A passing result with no conflicts.
    pub fn clean() -> Self {
        ValidationResult::default()
    }

    pub(crate) fn record(&mut self, key: &Key, conflict_type: ConflictType) {
        self.conflicts.push(Conflict {
            key: key.clone(),
            conflict_type,
        });
    }

    /// True when every observation still holds.
    pub fn is_ok(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// The stale entries, in read-set iteration order.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Number of stale entries.
    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Whether the result carries no conflicts. Same as `is_ok`.
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.conflicts.is_empty() {
            return f.write_str("no conflicts");
        }
        write!(f, "{} conflict(s): ", self.conflicts.len())?;
        for (i, conflict) in self.conflicts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", conflict)?;
        }
        Ok(())
    }
}

// ============================================================================
// Policy trait and strategies
// ============================================================================

/// A conflict-detection strategy, chosen once at store construction.
///
/// Implementations must be pure checks: no store mutation, no state of
/// their own. The committer calls `validate` while holding the commit
/// lock, so the store cannot change mid-check.
pub trait ValidationPolicy: Send + Sync {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Compare every read-set observation of `txn` against `store` as it
    /// stands now. `current_ts` is the commit-log length at validation
    /// time, used to interpret version closure.
    fn validate(
        &self,
        txn: &TransactionContext,
        store: &VersionStore,
        current_ts: Timestamp,
    ) -> ValidationResult;
}

/// Select the strategy matching the store's concurrency policy.
pub fn policy_for(policy: ConcurrencyPolicy) -> Box<dyn ValidationPolicy> {
    match policy {
        ConcurrencyPolicy::Flat => Box::new(FlatValidation),
        ConcurrencyPolicy::Snapshot => Box::new(SnapshotValidation),
    }
}

/// Content-equality validation for the single-version policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatValidation;

impl ValidationPolicy for FlatValidation {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn validate(
        &self,
        txn: &TransactionContext,
        store: &VersionStore,
        _current_ts: Timestamp,
    ) -> ValidationResult {
        let mut result = ValidationResult::clean();
        for (key, observation) in txn.reads() {
            let current = store.head(key);
            match (observation, current) {
                (Observation::Missing, None) => {}
                (Observation::Missing, Some(_)) => {
                    result.record(key, ConflictType::KeyAppeared);
                }
                (Observation::Value(_), None) | (Observation::Version(_), None) => {
                    result.record(key, ConflictType::KeyVanished);
                }
                (Observation::Value(seen), Some(head)) => {
                    if head.value() != seen {
                        result.record(key, ConflictType::ValueChanged);
                    }
                }
                // A version observation under the flat policy degrades to
                // value comparison; there is no interval to consult.
                (Observation::Version(seen), Some(head)) => {
                    if head.value() != seen.value() {
                        result.record(key, ConflictType::ValueChanged);
                    }
                }
            }
        }
        result
    }
}

/// Version-identity validation for the multi-version policy.
///
/// First committer wins: the head of each read key's chain must still be
/// the version the transaction observed. This check catches concurrent
/// commits on read-only keys too, which is why reads record observations
/// whether or not the transaction ever writes the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotValidation;

impl ValidationPolicy for SnapshotValidation {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn validate(
        &self,
        txn: &TransactionContext,
        store: &VersionStore,
        current_ts: Timestamp,
    ) -> ValidationResult {
        let mut result = ValidationResult::clean();
        for (key, observation) in txn.reads() {
            match observation {
                Observation::Missing => {
                    if store.contains(key) {
                        result.record(key, ConflictType::KeyAppeared);
                    }
                }
                Observation::Version(seen) => {
                    match store.head_stamp(key) {
                        None => result.record(key, ConflictType::KeyVanished),
                        Some(head) if head != seen.stamp() => {
                            result.record(key, ConflictType::NewerVersion);
                        }
                        Some(_) => {
                            // Head unchanged; reject if the observed version
                            // was closed out from under us anyway.
                            let closed = store
                                .version_started_at(key, seen.begin_ts())
                                .and_then(|v| v.end_ts())
                                .map(|end| end <= current_ts)
                                .unwrap_or(false);
                            if closed {
                                result.record(key, ConflictType::VersionClosed);
                            }
                        }
                    }
                }
                // Value observations do not arise under this policy; fall
                // back to content comparison rather than failing open.
                Observation::Value(seen) => match store.head(key) {
                    None => result.record(key, ConflictType::KeyVanished),
                    Some(head) => {
                        if head.value() != seen {
                            result.record(key, ConflictType::ValueChanged);
                        }
                    }
                },
            }
        }
        result
    }
}
