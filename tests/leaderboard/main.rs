//! Leaderboard Test Suite
//!
//! The score-tracking workload end to end: fixture loading, concurrent
//! submissions, and ranked reporting.

#[path = "../common/mod.rs"]
mod common;

mod submissions;
