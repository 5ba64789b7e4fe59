//! Versioned values with validity intervals
//!
//! A [`Version`] is one committed value of one key. Under the snapshot
//! policy versions form per-key chains; under the flat policy a chain
//! holds a single version and the interval fields are inert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use versa_core::types::{Timestamp, TxnId};
use versa_core::Value;

/// One committed value of one key.
///
/// A version is immutable once created, with a single exception: `end_ts`
/// transitions exactly once from absent to set when a later commit
/// supersedes it. Fields are private so that transition can only happen
/// through [`Version::close`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    value: Value,
    begin_ts: Timestamp,
    end_ts: Option<Timestamp>,
    owner: TxnId,
    created_at: DateTime<Utc>,
}

impl Version {
    /// Create an open version committed at `begin_ts` by `owner`.
    pub fn new(value: Value, begin_ts: Timestamp, owner: TxnId) -> Self {
        Version {
            value,
            begin_ts,
            end_ts: None,
            owner,
            created_at: Utc::now(),
        }
    }

    /// The committed value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the version, keeping only its value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Logical time this version became visible.
    pub fn begin_ts(&self) -> Timestamp {
        self.begin_ts
    }

    /// Logical time this version stopped being current, if it has been
    /// superseded.
    pub fn end_ts(&self) -> Option<Timestamp> {
        self.end_ts
    }

    /// Transaction that committed this version.
    pub fn owner(&self) -> TxnId {
        self.owner
    }

    /// Wall-clock creation time. Metadata only; never consulted for
    /// visibility or validation.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this version is still current (no end timestamp).
    pub fn is_open(&self) -> bool {
        self.end_ts.is_none()
    }

    /// Whether this version is visible to a reader at logical time `ts`:
    /// `begin_ts <= ts < end_ts`, with an absent `end_ts` treated as +inf.
    pub fn is_visible_at(&self, ts: Timestamp) -> bool {
        match self.end_ts {
            None => self.begin_ts <= ts,
            Some(end) => self.begin_ts <= ts && ts < end,
        }
    }

    /// Close this version at `end_ts`. Must only be called once, on an
    /// open version, from inside the commit critical section.
    pub(crate) fn close(&mut self, end_ts: Timestamp) {
        debug_assert!(self.end_ts.is_none(), "version closed twice");
        self.end_ts = Some(end_ts);
    }

    /// The version's identity: enough to tell whether the chain head has
    /// moved past it.
    pub fn stamp(&self) -> VersionStamp {
        VersionStamp {
            begin_ts: self.begin_ts,
            owner: self.owner,
        }
    }
}

/// Lightweight identity of a version: which commit created it.
///
/// Two versions of the same key are the same version exactly when their
/// stamps match; `begin_ts` alone would do, since at most one commit per
/// key happens per tick, but carrying the owner makes conflict reports
/// self-explanatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionStamp {
    /// Logical time of the creating commit.
    pub begin_ts: Timestamp,
    /// Transaction that committed it.
    pub owner: TxnId,
}

impl std::fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v@{} by txn {}", self.begin_ts, self.owner)
    }
}
