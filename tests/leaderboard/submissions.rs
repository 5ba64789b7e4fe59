//! Score submissions under contention.
//!
//! The canonical workload: four clients race read-modify-write updates
//! against a five-user board, two of them targeting the same user. Every
//! delta must land exactly once regardless of interleaving.

use std::sync::{Arc, Barrier};
use std::thread;

use versadb::prelude::*;

use crate::common;

#[test]
fn test_sequential_submissions_accumulate() {
    let db = common::seeded_db();

    assert_eq!(db.leaderboard.submit_score(1, 50).unwrap(), 150);
    assert_eq!(db.leaderboard.submit_score(1, -20).unwrap(), 130);
    assert_eq!(db.leaderboard.submit_score(1, 0).unwrap(), 130);

    assert_eq!(db.leaderboard.get(1).unwrap().unwrap().score, 130);
    assert_eq!(db.now(), 8, "five loads plus three submissions");
}

#[test]
fn test_concurrent_submissions_all_land() {
    for policy in [ConcurrencyPolicy::Flat, ConcurrencyPolicy::Snapshot] {
        let db = Arc::new(common::seeded_with_policy(policy));
        let deltas: &[(u64, i64)] = &[(1, 50), (2, 30), (3, 70), (1, -20)];

        let barrier = Arc::new(Barrier::new(deltas.len()));
        let handles: Vec<_> = deltas
            .iter()
            .map(|&(user, delta)| {
                let db = Arc::clone(&db);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    db.leaderboard.submit_score(user, delta).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(db.leaderboard.get(1).unwrap().unwrap().score, 130);
        assert_eq!(db.leaderboard.get(2).unwrap().unwrap().score, 230);
        assert_eq!(db.leaderboard.get(3).unwrap().unwrap().score, 220);
        assert_eq!(
            db.now(),
            9,
            "each submission commits exactly once ({policy})"
        );

        let order: Vec<u64> = db
            .leaderboard
            .standings()
            .rows()
            .iter()
            .map(|r| r.user_id)
            .collect();
        assert_eq!(order, vec![2, 3, 4, 1, 5], "final ranking under {policy}");
    }
}

#[test]
fn test_unknown_user_fails_without_retry() {
    let db = common::seeded_db();
    let before = db.metrics();

    let err = db.leaderboard.submit_score(42, 10).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let after = db.metrics();
    assert_eq!(
        after.transactions_started - before.transactions_started,
        1,
        "a missing user is not a conflict and must not be retried"
    );
    assert_eq!(after.transactions_aborted - before.transactions_aborted, 1);
    assert_eq!(db.now(), 5, "nothing committed");
}

#[test]
fn test_submission_timestamps_refresh() {
    let db = common::seeded_db();
    let before = db.leaderboard.get(3).unwrap().unwrap();
    assert_eq!(before.last_submission, "2024-01-01");

    db.leaderboard.submit_score(3, 1).unwrap();

    let after = db.leaderboard.get(3).unwrap().unwrap();
    assert_ne!(after.last_submission, before.last_submission);
    assert_eq!(after.last_submission.len(), "2024-01-01 00:00:00".len());
}

#[test]
fn test_burst_metrics_account_for_every_attempt() {
    let db = Arc::new(common::seeded_db());
    let threads = 6;
    let rounds = 5;

    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..rounds {
                    db.leaderboard.submit_score(5, 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected_commits = 5 + (threads * rounds) as u64;
    let metrics = db.metrics();
    assert_eq!(db.leaderboard.get(5).unwrap().unwrap().score, 120 + 30);
    assert_eq!(metrics.transactions_committed, expected_commits);
    assert_eq!(
        metrics.transactions_started,
        metrics.transactions_committed + metrics.transactions_aborted
    );
    assert_eq!(metrics.transactions_active, 0);
    assert_eq!(db.now(), expected_commits);
}
