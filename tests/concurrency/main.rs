//! Concurrency Test Suite
//!
//! End-to-end checks of transaction isolation, conflict detection, and
//! commit-log behavior under both validation policies.

#[path = "../common/mod.rs"]
mod common;

mod commit_log;
mod lost_updates;
mod policies;
mod snapshots;
