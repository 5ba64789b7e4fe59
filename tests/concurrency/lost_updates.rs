//! Lost-update protection: N concurrent read-increment-commit loops on one
//! key must account for every increment, whatever the interleaving.

use std::sync::{Arc, Barrier};

use versadb::prelude::*;

use crate::common;

fn increment_until_committed(db: &Versa, key: &str, delta: i64) {
    loop {
        let txn = db.begin();
        let current = txn
            .get(key)
            .unwrap()
            .and_then(|v| v.as_int())
            .expect("key seeded");
        txn.put(key, current + delta).unwrap();
        if txn.commit().unwrap().is_committed() {
            return;
        }
    }
}

#[test]
fn test_concurrent_increments_all_land() {
    for policy in [ConcurrencyPolicy::Flat, ConcurrencyPolicy::Snapshot] {
        common::init_tracing();
        let db = Arc::new(Versa::builder().policy(policy).no_retry().build());
        db.transaction(|t| t.put("user_1", 100i64)).unwrap();

        let threads = 8;
        let per_thread = 10;
        let barrier = Arc::new(Barrier::new(threads));
        let mut handles = Vec::new();

        for _ in 0..threads {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    increment_until_committed(&db, "user_1", 1);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let final_value = db.transaction(|txn| txn.get("user_1")).unwrap();
        assert_eq!(
            final_value,
            Some(Value::Int(100 + (threads * per_thread) as i64)),
            "policy {} lost updates",
            policy
        );
    }
}

#[test]
fn test_mixed_deltas_sum_exactly() {
    common::init_tracing();
    let db = Arc::new(Versa::builder().retry(common::contention_retry()).build());
    db.transaction(|t| t.put("user_1", 0i64)).unwrap();

    let deltas: Vec<i64> = vec![50, 30, 70, -20, 5, -5, 100, 1];
    let barrier = Arc::new(Barrier::new(deltas.len()));
    let mut handles = Vec::new();

    for delta in deltas.clone() {
        let db = Arc::clone(&db);
        let barrier = Arc::clone(&barrier);
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            db.transaction_with_retry(|txn| {
                let current = txn.get("user_1")?.and_then(|v| v.as_int()).unwrap_or(0);
                txn.put("user_1", current + delta)?;
                Ok(())
            })
            .expect("retry budget large enough for eight writers");
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let expected: i64 = deltas.iter().sum();
    let final_value = db.transaction(|txn| txn.get("user_1")).unwrap();
    assert_eq!(final_value, Some(Value::Int(expected)));
}

#[test]
fn test_disjoint_keys_never_conflict() {
    common::init_tracing();
    let db = Arc::new(Versa::builder().no_retry().build());

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let mut handles = Vec::new();

    for t in 0..threads as i64 {
        let db = Arc::clone(&db);
        let barrier = Arc::clone(&barrier);
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            for i in 0..20 {
                // each thread owns its key: no retry policy needed
                db.transaction(|txn| {
                    let key = format!("user_{}", t);
                    let current = txn.get(key.clone())?.and_then(|v| v.as_int()).unwrap_or(0);
                    txn.put(key, current + i)?;
                    Ok(())
                })
                .expect("disjoint writers cannot conflict");
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let expected: i64 = (0..20).sum();
    for t in 0..threads as i64 {
        let seen = db
            .transaction(|txn| txn.get(format!("user_{}", t)))
            .unwrap();
        assert_eq!(seen, Some(Value::Int(expected)));
    }
}
