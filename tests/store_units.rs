// tests/store_units.rs

use std::sync::Arc;

use dynadag::store::{Claim, FingerprintState, FingerprintStore, MemoCache, OnceSlot, TargetStore};
use dynadag::{ContractViolation, TargetId};

#[tokio::test]
async fn slot_keeps_the_first_value_and_wakes_waiters() {
    let slot = Arc::new(OnceSlot::<u32>::new());
    assert!(!slot.is_set());

    let waiter = {
        let slot = Arc::clone(&slot);
        tokio::spawn(async move { slot.wait().await })
    };
    tokio::task::yield_now().await;

    assert!(slot.publish(1));
    assert!(!slot.publish(2));

    assert_eq!(waiter.await.unwrap(), Some(1));
    assert_eq!(slot.get(), Some(1));
    assert_eq!(slot.wait().await, Some(1));
}

#[test]
fn memo_hands_out_one_owner_per_key() {
    let mut memo = MemoCache::<&str, u32>::new();

    let first = memo.claim(&"a");
    let second = memo.claim(&"a");
    let other = memo.claim(&"b");

    assert!(first.is_owner());
    assert!(matches!(second, Claim::Waiter(_)));
    assert!(other.is_owner());
    assert!(Arc::ptr_eq(first.slot(), second.slot()));

    assert_eq!(memo.get(&"a"), None);
    first.slot().publish(3);
    assert_eq!(memo.get(&"a"), Some(3));
    assert_eq!(memo.len(), 2);
    assert!(memo.contains(&"b"));
}

#[test]
fn target_store_allows_one_claim_and_one_publish() {
    let mut store = TargetStore::<u32>::new();
    let id = TargetId::new("t");

    let early = store.get_or_create(&id);
    let owned = store.claim(&id).unwrap();
    assert!(Arc::ptr_eq(&early, &owned));
    assert_eq!(
        store.claim(&id).unwrap_err(),
        ContractViolation::TargetClaimedTwice(id.clone())
    );

    assert!(!store.is_ready(&id));
    store.publish(&id, 5).unwrap();
    assert!(store.is_ready(&id));
    assert_eq!(
        store.publish(&id, 6).unwrap_err(),
        ContractViolation::TargetPublishedTwice(id.clone())
    );
    assert_eq!(early.get(), Some(5));
    assert!(Arc::ptr_eq(&store.slot(&id).unwrap(), &early));
    assert!(store.slot(&TargetId::new("unknown")).is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn fingerprint_try_start_transitions() {
    let store = FingerprintStore::<String>::new();
    let id = TargetId::new("obj");

    let (started, prior) = store.try_start(&id);
    assert!(!started);
    assert_eq!(prior, FingerprintState::NotStarted);
    assert_eq!(store.state(&id), FingerprintState::Started);

    let (started, prior) = store.try_start(&id);
    assert!(started);
    assert_eq!(prior, FingerprintState::Started);

    store.mark_failed(&id);
    let (started, prior) = store.try_start(&id);
    assert!(!started, "a failed build may be retried");
    assert_eq!(prior, FingerprintState::Failed);

    store.mark_succeeded(&id, "done".to_string());
    let (started, prior) = store.try_start(&id);
    assert!(started);
    assert_eq!(prior, FingerprintState::Succeeded("done".to_string()));
    assert_eq!(store.state(&id), FingerprintState::Succeeded("done".to_string()));
}

#[test]
fn fingerprint_revert_undoes_a_start() {
    let store = FingerprintStore::<String>::new();
    let fresh = TargetId::new("fresh");
    let failed = TargetId::new("failed");

    let (_, prior) = store.try_start(&fresh);
    store.revert(&fresh, prior);
    assert_eq!(store.state(&fresh), FingerprintState::NotStarted);

    store.mark_failed(&failed);
    let (_, prior) = store.try_start(&failed);
    assert_eq!(store.state(&failed), FingerprintState::Started);
    store.revert(&failed, prior);
    assert_eq!(store.state(&failed), FingerprintState::Failed);
}

#[test]
fn content_ids_are_stable_and_length_prefixed() {
    let a = TargetId::from_content(["cc -c main.c", "build"]);
    let b = TargetId::from_content(["cc -c main.c", "build"]);
    let shifted = TargetId::from_content(["cc -c main.cb", "uild"]);

    assert_eq!(a, b);
    assert_ne!(a, shifted);
    assert_eq!(a.as_str().len(), 64);
    assert_eq!(TargetId::from("x").to_string(), "x");
}
