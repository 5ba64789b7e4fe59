//! Core types for the transaction engine
//!
//! This module defines the fundamental types used throughout the system:
//! - [`Key`]: Record identifier in the store
//! - [`TxnId`]: Unique identifier for transactions
//! - [`Timestamp`]: Logical time, measured as commit-log length
//! - [`ConcurrencyPolicy`]: Validation strategy chosen at store construction

use serde::{Deserialize, Serialize};

/// Logical timestamp.
///
/// Timestamps are commit-log lengths: the clock reads `n` after exactly `n`
/// successful commits. Transaction creation captures the then-current value
/// without advancing it.
pub type Timestamp = u64;

/// Identifier for a record in the store.
///
/// Keys are opaque UTF-8 strings. They are used in:
/// - Version chains (one chain per key)
/// - Transaction read and write sets
/// - The reporting scan
///
/// # Examples
///
/// ```
/// use versa_core::types::Key;
///
/// let key = Key::from("user_1");
/// assert_eq!(key.as_str(), "user_1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(String);

impl Key {
    /// Create a new key.
    pub fn new(name: impl Into<String>) -> Self {
        Key(name.into())
    }

    /// View the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a transaction.
///
/// Ids are allocated sequentially starting at 1 and are never reused, even
/// after the transaction aborts. They appear in the commit log and as
/// version owners.
///
/// # Examples
///
/// ```
/// use versa_core::types::TxnId;
///
/// let id = TxnId::new(42);
/// assert_eq!(id.as_u64(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxnId(u64);

impl TxnId {
    /// Create a TxnId from a raw integer.
    pub fn new(raw: u64) -> Self {
        TxnId(raw)
    }

    /// Get the raw integer representation.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concurrency-control strategy, fixed at store construction.
///
/// Both policies defer conflict checking to commit time; they differ in what
/// the store retains and what validation compares:
///
/// - `Flat`: one current value per key. Validation compares the value a
///   transaction observed against the current value by content equality.
/// - `Snapshot`: an append-only version chain per key with validity
///   intervals. Reads resolve against the transaction's begin timestamp;
///   validation rejects any read whose version was superseded or closed.
///
/// # Examples
///
/// ```
/// use versa_core::types::ConcurrencyPolicy;
///
/// let policy = ConcurrencyPolicy::default();
/// assert_eq!(policy, ConcurrencyPolicy::Snapshot);
/// assert_eq!(policy.to_string(), "snapshot");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConcurrencyPolicy {
    /// Single current value per key, validated by equality.
    Flat,
    /// Multi-version chains with snapshot-isolation validation.
    Snapshot,
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        ConcurrencyPolicy::Snapshot
    }
}

impl std::fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcurrencyPolicy::Flat => write!(f, "flat"),
            ConcurrencyPolicy::Snapshot => write!(f, "snapshot"),
        }
    }
}
