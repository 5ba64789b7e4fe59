//! The version store: per-key chains behind a concurrent map
//!
//! # Design
//!
//! - DashMap: sharded key table, lock-free reads
//! - VersionChain per key: append-only history (snapshot policy) or a
//!   single replaced slot (flat policy)
//! - The policy is fixed at construction and drives both how `apply`
//!   mutates a chain and how reads resolve
//!
//! # Thread Safety
//!
//! Reads take DashMap read guards and return clones, so nothing a caller
//! holds aliases store state. `apply` is only ever invoked from inside the
//! committer's critical section; the store itself does not serialize
//! commits.

use dashmap::DashMap;
use versa_core::types::{ConcurrencyPolicy, Key, Timestamp, TxnId};
use versa_core::Value;

use crate::chain::VersionChain;
use crate::version::{Version, VersionStamp};

/// Keyed record store with either flat or multi-version retention.
///
/// # Example
///
/// ```ignore
/// use versa_storage::VersionStore;
/// use versa_core::types::ConcurrencyPolicy;
/// use std::sync::Arc;
///
/// let store = Arc::new(VersionStore::new(ConcurrencyPolicy::Snapshot));
/// let head = store.head(&"user_1".into());
/// ```
pub struct VersionStore {
    /// One chain per key.
    chains: DashMap<Key, VersionChain>,
    /// Retention/validation strategy, fixed for the store's lifetime.
    policy: ConcurrencyPolicy,
}

impl VersionStore {
    /// Create an empty store with the given policy.
    pub fn new(policy: ConcurrencyPolicy) -> Self {
        VersionStore {
            chains: DashMap::new(),
            policy,
        }
    }

    /// Create with expected number of keys.
    pub fn with_capacity(policy: ConcurrencyPolicy, keys: usize) -> Self {
        VersionStore {
            chains: DashMap::with_capacity(keys),
            policy,
        }
    }

    /// The store's concurrency policy.
    #[inline]
    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read the version visible at logical time `ts`.
    ///
    /// Under the snapshot policy this resolves the key's chain by validity
    /// interval. Under the flat policy there is no history and no interval
    /// semantics; the current version is returned regardless of `ts`.
    /// Returns `None` if the key has never been written (or, under
    /// snapshot, was not yet written as of `ts`).
    pub fn read_as_of(&self, key: &Key, ts: Timestamp) -> Option<Version> {
        let chain = self.chains.get(key)?;
        match self.policy {
            ConcurrencyPolicy::Flat => chain.head().cloned(),
            ConcurrencyPolicy::Snapshot => chain.visible_at(ts).cloned(),
        }
    }

    /// The newest version of a key, regardless of visibility.
    pub fn head(&self, key: &Key) -> Option<Version> {
        self.chains.get(key).and_then(|chain| chain.head().cloned())
    }

    /// Identity of the newest version of a key.
    #[inline]
    pub fn head_stamp(&self, key: &Key) -> Option<VersionStamp> {
        self.chains
            .get(key)
            .and_then(|chain| chain.head().map(|v| v.stamp()))
    }

    /// The version of `key` created at exactly `begin_ts`, in its current
    /// state (its `end_ts` may have been set since it was observed).
    pub fn version_started_at(&self, key: &Key, begin_ts: Timestamp) -> Option<Version> {
        self.chains
            .get(key)
            .and_then(|chain| chain.version_started_at(begin_ts).cloned())
    }

    /// Check if a key has ever been written.
    #[inline]
    pub fn contains(&self, key: &Key) -> bool {
        self.chains.contains_key(key)
    }

    /// Number of keys with at least one version.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// All known keys, sorted.
    ///
    /// Requires collect + sort; list operations are not on the hot path.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.chains.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Current value of every key, sorted by key.
    ///
    /// This is the store-level scan the reporting collaborator uses; it
    /// reads chain heads, not any particular snapshot.
    pub fn latest(&self) -> Vec<(Key, Value)> {
        let mut rows: Vec<(Key, Value)> = self
            .chains
            .iter()
            .filter_map(|e| e.value().head().map(|v| (e.key().clone(), v.value().clone())))
            .collect();
        rows.sort_by(|(a, _), (b, _)| a.cmp(b));
        rows
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Install a committed value for `key` at `commit_ts`.
    ///
    /// Snapshot policy: closes the currently-open version (its `end_ts`
    /// becomes `commit_ts`) and appends an open version
    /// `{value, begin_ts: commit_ts, owner}`. Flat policy: replaces the
    /// single stored version outright.
    ///
    /// Only the committer calls this, inside the commit critical section;
    /// it is never correct to call it standalone, because validation and
    /// application must be one atomic step.
    pub fn apply(&self, key: &Key, value: Value, commit_ts: Timestamp, owner: TxnId) {
        let mut chain = self.chains.entry(key.clone()).or_default();
        let version = Version::new(value, commit_ts, owner);
        match self.policy {
            ConcurrencyPolicy::Flat => chain.replace(version),
            ConcurrencyPolicy::Snapshot => {
                chain.close_open(commit_ts);
                chain.push(version);
            }
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Number of versions retained for a key.
    pub fn chain_len(&self, key: &Key) -> usize {
        self.chains.get(key).map(|chain| chain.len()).unwrap_or(0)
    }

    /// Number of open versions for a key. 0 or 1 between commits.
    pub fn open_versions(&self, key: &Key) -> usize {
        self.chains
            .get(key)
            .map(|chain| chain.open_count())
            .unwrap_or(0)
    }

    /// Total number of versions across all keys.
    pub fn total_versions(&self) -> usize {
        self.chains.iter().map(|e| e.value().len()).sum()
    }
}

impl std::fmt::Debug for VersionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionStore")
            .field("policy", &self.policy)
            .field("keys", &self.len())
            .field("total_versions", &self.total_versions())
            .finish()
    }
}
