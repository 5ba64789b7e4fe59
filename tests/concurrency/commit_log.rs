//! The commit log is the clock: exactly one tick per successful commit,
//! none for aborts or conflicts.

use std::sync::{Arc, Barrier};

use versadb::prelude::*;

use crate::common;

#[test]
fn test_clock_counts_successful_commits_only() {
    common::init_tracing();
    let db = Versa::builder().no_retry().build();
    assert_eq!(db.now(), 0);

    db.transaction(|t| t.put("user_1", 100i64)).unwrap();
    assert_eq!(db.now(), 1);

    // explicit abort: no tick
    let txn = db.begin();
    txn.put("user_1", 1i64).unwrap();
    txn.abort("discard").unwrap();
    assert_eq!(db.now(), 1);

    // conflicted commit: no tick
    let stale = db.begin();
    stale.get("user_1").unwrap();
    stale.put("user_1", 2i64).unwrap();
    db.transaction(|t| t.put("user_1", 3i64)).unwrap();
    assert_eq!(db.now(), 2);
    assert!(!stale.commit().unwrap().is_committed());
    assert_eq!(db.now(), 2);
}

#[test]
fn test_commit_ts_equals_log_length_at_commit() {
    common::init_tracing();
    let db = Versa::new();

    for expected_ts in 0..5u64 {
        let txn = db.begin();
        txn.put("user_1", expected_ts as i64).unwrap();
        let outcome = txn.commit().unwrap();
        assert_eq!(outcome.commit_ts(), Some(expected_ts));
        assert_eq!(db.now(), expected_ts + 1);
    }
}

#[test]
fn test_log_preserves_commit_order() {
    common::init_tracing();
    let db = Versa::new();

    let a = db.begin();
    let b = db.begin();
    let c = db.begin();

    // commit out of begin order
    b.put("user_2", 2i64).unwrap();
    let b_id = b.id();
    b.commit().unwrap();

    c.put("user_3", 3i64).unwrap();
    let c_id = c.id();
    c.commit().unwrap();

    a.put("user_1", 1i64).unwrap();
    let a_id = a.id();
    a.commit().unwrap();

    assert_eq!(db.manager().committed_ids(), vec![b_id, c_id, a_id]);
}

#[test]
fn test_clock_exact_under_concurrent_commits() {
    common::init_tracing();
    let db = Arc::new(Versa::builder().no_retry().build());
    let threads = 8;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(threads));
    let mut handles = Vec::new();

    for t in 0..threads {
        let db = Arc::clone(&db);
        let barrier = Arc::clone(&barrier);
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            for i in 0..per_thread {
                db.transaction(|txn| txn.put(format!("k_{}_{}", t, i), i as i64))
                    .expect("disjoint keys commit cleanly");
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let total = (threads * per_thread) as u64;
    assert_eq!(db.now(), total);

    let ids = db.manager().committed_ids();
    assert_eq!(ids.len(), total as usize);
    // every committed id is distinct
    let mut seen: Vec<u64> = ids.iter().map(|id| id.as_u64()).collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), total as usize);
}
