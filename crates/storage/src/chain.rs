//! Per-key version chains
//!
//! A [`VersionChain`] is the ordered history of one key: versions sorted by
//! `begin_ts` ascending, append-only. At most one version is open at any
//! quiescent moment; appending a new version closes the previous one first.

use smallvec::SmallVec;
use versa_core::types::Timestamp;

use crate::version::Version;

/// Ordered, append-only history of one key.
///
/// Most keys see few updates, so the first two versions live inline.
#[derive(Debug, Clone, Default)]
pub struct VersionChain {
    versions: SmallVec<[Version; 2]>,
}

impl VersionChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        VersionChain {
            versions: SmallVec::new(),
        }
    }

    /// Append a version. Chains grow strictly forward in time.
    pub fn push(&mut self, version: Version) {
        debug_assert!(
            self.versions
                .last()
                .map(|prev| prev.begin_ts() <= version.begin_ts())
                .unwrap_or(true),
            "chain must stay ordered by begin_ts"
        );
        self.versions.push(version);
    }

    /// Drop all history and keep a single version. Used by the flat policy,
    /// which retains no intervals.
    pub fn replace(&mut self, version: Version) {
        self.versions.clear();
        self.versions.push(version);
    }

    /// The newest version, regardless of visibility.
    pub fn head(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// The version visible at logical time `ts`, if any.
    ///
    /// Scans newest to oldest; the match is unique because intervals of one
    /// key never overlap.
    pub fn visible_at(&self, ts: Timestamp) -> Option<&Version> {
        self.versions.iter().rev().find(|v| v.is_visible_at(ts))
    }

    /// The currently-open version, if any.
    pub fn open(&self) -> Option<&Version> {
        self.versions.iter().rev().find(|v| v.is_open())
    }

    /// Close the open version at `end_ts`. Returns whether one was open.
    pub fn close_open(&mut self, end_ts: Timestamp) -> bool {
        if let Some(open) = self.versions.iter_mut().rev().find(|v| v.is_open()) {
            open.close(end_ts);
            true
        } else {
            false
        }
    }

    /// Find the version created at exactly `begin_ts`.
    pub fn version_started_at(&self, begin_ts: Timestamp) -> Option<&Version> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.begin_ts() == begin_ts)
    }

    /// Number of open versions. Always 0 or 1 between commits; exposed for
    /// invariant checks.
    pub fn open_count(&self) -> usize {
        self.versions.iter().filter(|v| v.is_open()).count()
    }

    /// Number of versions in the chain.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the chain holds no versions.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }
}
