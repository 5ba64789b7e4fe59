//! Timestamp oracle backed by the commit log
//!
//! # Design
//!
//! Logical time is the length of the commit log. There is no separate
//! counter to keep in sync: appending a committed transaction id IS the
//! clock tick, and nothing else advances time. Transactions that begin,
//! read, and abort leave the clock untouched.
//!
//! `now()` is lock-free: the length is mirrored in an atomic that is only
//! written while the entries lock is held, so the mirror never runs ahead
//! of the log.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use versa_core::types::{Timestamp, TxnId};

/// Append-only record of committed transactions, doubling as the clock.
///
/// # Thread Safety
///
/// `append` is only called from inside the committer's critical section,
/// so writes are already serialized. Readers (`now`, `len`) never block.
#[derive(Debug, Default)]
pub struct CommitLog {
    /// Committed transaction ids, in commit order. Index = commit position.
    entries: RwLock<Vec<TxnId>>,
    /// Mirror of `entries.len()`, updated before the write lock drops.
    len: AtomicU64,
}

impl CommitLog {
    /// Create an empty log. Logical time starts at 0.
    pub fn new() -> Self {
        CommitLog::default()
    }

    /// Current logical time: the number of commits so far.
    ///
    /// Side-effect-free and monotonic non-decreasing. Concurrent callers
    /// observing the same value between commits is expected; time advances
    /// only when a commit appends.
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.len.load(Ordering::Acquire)
    }

    /// Record a successful commit, advancing the clock by exactly one.
    ///
    /// Returns the position the id was appended at, which equals the
    /// logical time the committer observed before appending.
    pub(crate) fn append(&self, tid: TxnId) -> Timestamp {
        let mut entries = self.entries.write();
        let position = entries.len() as Timestamp;
        entries.push(tid);
        self.len.store(entries.len() as u64, Ordering::Release);
        position
    }

    /// Number of committed transactions. Same value as `now()`.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire) as usize
    }

    /// Whether any transaction has committed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the committed ids in commit order.
    pub fn committed_ids(&self) -> Vec<TxnId> {
        self.entries.read().clone()
    }
}
