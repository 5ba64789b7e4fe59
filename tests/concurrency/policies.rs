//! Where the two validation policies agree, and the one place they split:
//! a value changed and then restored between read and commit.

use std::sync::{Arc, Barrier};

use versadb::prelude::*;

use crate::common;

fn db_with(policy: ConcurrencyPolicy) -> Versa {
    common::init_tracing();
    let db = Versa::builder().policy(policy).no_retry().build();
    db.transaction(|t| t.put("user_1", 100i64)).unwrap();
    db
}

#[test]
fn test_restored_value_splits_the_policies() {
    // flat compares content: change-then-restore is invisible to it.
    // snapshot compares version identity: the restore is a new version.
    for (policy, stale_commit_passes) in [
        (ConcurrencyPolicy::Flat, true),
        (ConcurrencyPolicy::Snapshot, false),
    ] {
        let db = db_with(policy);

        let stale = db.begin();
        assert_eq!(stale.get("user_1").unwrap(), Some(Value::Int(100)));
        stale.put("user_2", 1i64).unwrap();

        db.transaction(|t| t.put("user_1", 999i64)).unwrap();
        db.transaction(|t| t.put("user_1", 100i64)).unwrap();

        let outcome = stale.commit().unwrap();
        assert_eq!(
            outcome.is_committed(),
            stale_commit_passes,
            "policy {} drew the wrong conclusion from a restored value",
            policy
        );
    }
}

#[test]
fn test_policies_agree_on_plain_staleness() {
    for policy in [ConcurrencyPolicy::Flat, ConcurrencyPolicy::Snapshot] {
        let db = db_with(policy);

        let stale = db.begin();
        stale.get("user_1").unwrap();
        stale.put("user_1", 150i64).unwrap();

        db.transaction(|t| t.put("user_1", 120i64)).unwrap();

        assert!(
            !stale.commit().unwrap().is_committed(),
            "policy {} accepted a stale write",
            policy
        );
    }
}

#[test]
fn test_chain_invariant_after_concurrent_burst() {
    common::init_tracing();
    let db = Arc::new(Versa::builder().retry(common::contention_retry()).build());
    db.leaderboard.load_rows(&common::sample_rows()).unwrap();

    let threads = 6;
    let barrier = Arc::new(Barrier::new(threads));
    let mut handles = Vec::new();

    for t in 0..threads {
        let db = Arc::clone(&db);
        let barrier = Arc::clone(&barrier);
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            for i in 0..10u64 {
                // everyone hammers users 1..3, round-robin
                let user = 1 + ((t as u64 + i) % 3);
                db.leaderboard.submit_score(user, 1).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    // at quiescence every chain has exactly one open version
    let store = db.manager().store();
    for user in 1..=5u64 {
        let key = ScoreRow::key_for(user);
        assert_eq!(
            store.open_versions(&key),
            1,
            "user_{} chain lost its open-version invariant",
            user
        );
    }

    // sixty submissions of +1 landed across three users
    let total: i64 = db
        .leaderboard
        .standings()
        .rows()
        .iter()
        .map(|r| r.score)
        .sum();
    let seeded: i64 = common::sample_rows().iter().map(|r| r.score).sum();
    assert_eq!(total, seeded + (threads as i64) * 10);
}

#[test]
fn test_flat_chain_never_grows() {
    let db = db_with(ConcurrencyPolicy::Flat);
    for i in 0..10i64 {
        db.transaction(|t| t.put("user_1", i)).unwrap();
    }
    let store = db.manager().store();
    assert_eq!(store.chain_len(&Key::from("user_1")), 1);
    assert_eq!(store.total_versions(), 1);
}

#[test]
fn test_snapshot_chain_records_every_commit() {
    let db = db_with(ConcurrencyPolicy::Snapshot);
    for i in 0..10i64 {
        db.transaction(|t| t.put("user_1", i)).unwrap();
    }
    let store = db.manager().store();
    assert_eq!(store.chain_len(&Key::from("user_1")), 11);
    assert_eq!(store.open_versions(&Key::from("user_1")), 1);
}
