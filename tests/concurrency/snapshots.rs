//! Snapshot consistency: a transaction's view of a key never changes
//! between its begin and its commit, whatever commits around it.

use versadb::prelude::*;

use crate::common;

fn fresh(policy: ConcurrencyPolicy) -> Versa {
    common::init_tracing();
    let db = Versa::builder().policy(policy).no_retry().build();
    db.transaction(|txn| txn.put("user_1", 100i64))
        .expect("seed commit");
    db
}

#[test]
fn test_two_reads_identical_despite_concurrent_commit() {
    for policy in [ConcurrencyPolicy::Flat, ConcurrencyPolicy::Snapshot] {
        let db = fresh(policy);

        let txn = db.begin();
        let first = txn.get("user_1").unwrap();
        assert_eq!(first, Some(Value::Int(100)));

        db.transaction(|t| t.put("user_1", 120i64)).unwrap();

        let second = txn.get("user_1").unwrap();
        assert_eq!(
            first, second,
            "policy {}: view of user_1 changed mid-transaction",
            policy
        );
        txn.abort("read-only check done").unwrap();
    }
}

#[test]
fn test_observed_absence_is_stable() {
    for policy in [ConcurrencyPolicy::Flat, ConcurrencyPolicy::Snapshot] {
        let db = fresh(policy);

        let txn = db.begin();
        assert_eq!(txn.get("user_2").unwrap(), None);

        db.transaction(|t| t.put("user_2", 7i64)).unwrap();

        assert_eq!(
            txn.get("user_2").unwrap(),
            None,
            "policy {}: absent key appeared mid-transaction",
            policy
        );
        txn.abort("done").unwrap();
    }
}

#[test]
fn test_buffered_write_wins_over_snapshot() {
    let db = fresh(ConcurrencyPolicy::Snapshot);

    let txn = db.begin();
    assert_eq!(txn.get("user_1").unwrap(), Some(Value::Int(100)));
    txn.put("user_1", 150i64).unwrap();
    assert_eq!(txn.get("user_1").unwrap(), Some(Value::Int(150)));
    assert!(txn.commit().unwrap().is_committed());
}

#[test]
fn test_new_transaction_reads_latest_commit() {
    let db = fresh(ConcurrencyPolicy::Snapshot);
    db.transaction(|t| t.put("user_1", 120i64)).unwrap();

    let seen = db.transaction(|txn| txn.get("user_1")).unwrap();
    assert_eq!(seen, Some(Value::Int(120)));
}

#[test]
fn test_snapshot_store_retains_history() {
    let db = fresh(ConcurrencyPolicy::Snapshot);
    let seed_ts = db.now();
    db.transaction(|t| t.put("user_1", 120i64)).unwrap();
    db.transaction(|t| t.put("user_1", 170i64)).unwrap();

    let store = db.manager().store();
    let key = Key::from("user_1");
    assert_eq!(store.chain_len(&key), 3);
    assert_eq!(store.open_versions(&key), 1);

    // superseded versions still resolve at their old timestamps
    let old = store.read_as_of(&key, seed_ts.saturating_sub(1)).unwrap();
    assert_eq!(old.value(), &Value::Int(100));
    assert_eq!(store.head(&key).unwrap().value(), &Value::Int(170));
}

#[test]
fn test_flat_store_keeps_single_version() {
    let db = fresh(ConcurrencyPolicy::Flat);
    db.transaction(|t| t.put("user_1", 120i64)).unwrap();
    db.transaction(|t| t.put("user_1", 170i64)).unwrap();

    let store = db.manager().store();
    let key = Key::from("user_1");
    assert_eq!(store.chain_len(&key), 1);
    assert_eq!(store.head(&key).unwrap().value(), &Value::Int(170));
}

#[test]
fn test_aborted_transaction_leaves_no_writes() {
    let db = fresh(ConcurrencyPolicy::Snapshot);

    let txn = db.begin();
    txn.put("user_1", 999i64).unwrap();
    txn.put("user_9", 1i64).unwrap();
    txn.abort("rolled back by caller").unwrap();

    let store = db.manager().store();
    assert_eq!(
        store.head(&Key::from("user_1")).unwrap().value(),
        &Value::Int(100)
    );
    assert!(!store.contains(&Key::from("user_9")));
}
