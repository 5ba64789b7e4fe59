//! Versioned storage layer for versa
//!
//! This crate implements the multi-version record store with:
//! - Version: an immutable value tagged with its validity interval
//! - VersionChain: per-key append-only history
//! - VersionStore: DashMap-backed key table, flat or snapshot retention
//!
//! The store holds committed state only. Uncommitted writes live in
//! transaction write buffers (versa-concurrency) and reach the store
//! through `VersionStore::apply` inside the commit critical section.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod store;
pub mod version;

pub use chain::VersionChain;
pub use store::VersionStore;
pub use version::{Version, VersionStamp};
