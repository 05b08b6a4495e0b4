//! End-to-end purchase sessions driven through the public API.

use super::common::session::{
    recording_emitter, submission, wait_for_listeners, wait_until, Harness, ACCOUNT, LOCK,
};
use key_purchase_tracker::{
    constants::UNKNOWN_BLOCK_NUMBER,
    domain::track_key_purchase,
    models::{
        KeyRecord, NotifierError, TrackerError, TransactionSnapshot, TransactionStatus,
        TransactionType, TransactionUpdate,
    },
    services::{ChainEvent, EventName, InMemoryKeyLookup, WalletEvent},
    utils::unix_timestamp_in,
};

fn stored_purchase(hash: &str, account: &str, confirmations: u64) -> TransactionSnapshot {
    TransactionSnapshot {
        hash: hash.to_string(),
        from: account.to_string(),
        to: LOCK.to_string(),
        input: "0xdata".to_string(),
        transaction_type: TransactionType::KeyPurchase,
        status: TransactionStatus::Pending,
        confirmations,
        network: 1337,
        block_number: 100,
        key: format!("{LOCK}-{account}"),
        lock: LOCK.to_string(),
    }
}

fn confirmations(hash: &str, confirmations: u64) -> ChainEvent {
    ChainEvent::Updated {
        hash: hash.to_string(),
        update: TransactionUpdate {
            confirmations: Some(confirmations),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_new_purchase_from_submission_to_confirmation() {
    let harness = Harness::new();
    let stale_key = KeyRecord::new(LOCK, ACCOUNT, unix_timestamp_in(-1_000));
    let refreshed = KeyRecord::new(LOCK, ACCOUNT, unix_timestamp_in(86_400));
    let lookup = InMemoryKeyLookup::new();
    lookup.insert(refreshed.clone());
    let (updates, emitter) = recording_emitter();

    let handle = tokio::spawn(track_key_purchase(harness.session(
        ACCOUNT,
        Some(stale_key),
        lookup,
        emitter,
    )));
    wait_for_listeners(&harness.wallet, EventName::TransactionNew, 1).await;
    assert_eq!(harness.chain.listener_count(EventName::TransactionUpdated), 1);

    harness.wallet.emit(&submission("0x123"));
    wait_for_listeners(&harness.chain, EventName::TransactionUpdated, 1).await;
    wait_until(|| updates.lock().len() == 1).await;

    {
        let updates = updates.lock();
        let (transactions, key) = &updates[0];
        assert_eq!(key, &KeyRecord::placeholder(LOCK, ACCOUNT));
        let tx = &transactions["0x123"];
        assert_eq!(tx.status, TransactionStatus::Submitted);
        assert_eq!(tx.confirmations, 0);
        assert_eq!(tx.block_number, UNKNOWN_BLOCK_NUMBER);
        assert_eq!(tx.key, format!("{LOCK}-{ACCOUNT}"));
        assert_eq!(tx.lock, LOCK);
        assert_eq!(tx.network, 1337);
        assert_eq!(tx.from, ACCOUNT);
    }
    assert_eq!(harness.wallet.listener_count(EventName::TransactionNew), 0);
    assert_eq!(harness.wallet.listener_count(EventName::Error), 0);

    harness.chain.emit(&ChainEvent::Updated {
        hash: "0x123".to_string(),
        update: TransactionUpdate {
            block_number: Some(120),
            confirmations: Some(1),
            ..Default::default()
        },
    });
    wait_until(|| updates.lock().len() == 2).await;
    assert_eq!(
        updates.lock()[1].0["0x123"].status,
        TransactionStatus::Pending
    );

    harness.chain.emit(&confirmations("0x123", 3));

    let key = handle.await.unwrap().unwrap();
    assert_eq!(key, refreshed);
    assert_eq!(updates.lock().len(), 2);
    assert_eq!(harness.total_listeners(), 0);
    let stored = harness.transactions.get("0x123").unwrap();
    assert_eq!(stored.status, TransactionStatus::Mined);
    assert_eq!(stored.confirmations, 3);
    assert_eq!(stored.block_number, 120);
}

#[tokio::test]
async fn test_chain_update_right_after_submission_is_delivered() {
    let harness = Harness::new();
    let (updates, emitter) = recording_emitter();

    let handle = tokio::spawn(track_key_purchase(harness.session(
        ACCOUNT,
        None,
        InMemoryKeyLookup::new(),
        emitter,
    )));
    wait_for_listeners(&harness.wallet, EventName::TransactionNew, 1).await;

    // No yield between the two notifications.
    harness.wallet.emit(&submission("0x123"));
    assert_eq!(
        harness.chain.emit(&ChainEvent::Updated {
            hash: "0x123".to_string(),
            update: TransactionUpdate {
                status: Some(TransactionStatus::Pending),
                block_number: Some(123),
                confirmations: Some(1),
            },
        }),
        1
    );
    wait_until(|| updates.lock().len() == 2).await;
    {
        let updates = updates.lock();
        assert_eq!(updates[0].0["0x123"].status, TransactionStatus::Submitted);
        let tx = &updates[1].0["0x123"];
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.confirmations, 1);
        assert_eq!(tx.block_number, 123);
    }

    harness.chain.emit(&confirmations("0x123", 3));
    assert!(handle.await.unwrap().is_ok());
    assert_eq!(updates.lock().len(), 2);
    assert_eq!(harness.total_listeners(), 0);
}

#[tokio::test]
async fn test_chain_update_before_submission_is_applied_on_submission() {
    let harness = Harness::new();
    let (updates, emitter) = recording_emitter();

    let handle = tokio::spawn(track_key_purchase(harness.session(
        ACCOUNT,
        None,
        InMemoryKeyLookup::new(),
        emitter,
    )));
    wait_for_listeners(&harness.chain, EventName::TransactionUpdated, 1).await;

    harness.chain.emit(&ChainEvent::Updated {
        hash: "0x123".to_string(),
        update: TransactionUpdate {
            block_number: Some(123),
            confirmations: Some(2),
            ..Default::default()
        },
    });
    harness.wallet.emit(&submission("0x123"));
    wait_until(|| updates.lock().len() == 1).await;
    {
        let updates = updates.lock();
        let tx = &updates[0].0["0x123"];
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.confirmations, 2);
        assert_eq!(tx.block_number, 123);
    }

    harness.chain.emit(&confirmations("0x123", 3));
    assert!(handle.await.unwrap().is_ok());
    assert_eq!(harness.total_listeners(), 0);
}

#[tokio::test]
async fn test_resumes_pending_purchase_with_fresh_key() {
    let harness = Harness::new();
    harness
        .transactions
        .upsert(stored_purchase("0xabc", ACCOUNT, 1));
    let fresh_key = KeyRecord::new(LOCK, ACCOUNT, unix_timestamp_in(1_000));
    let (updates, emitter) = recording_emitter();

    let handle = tokio::spawn(track_key_purchase(harness.session(
        ACCOUNT,
        Some(fresh_key.clone()),
        InMemoryKeyLookup::new(),
        emitter,
    )));
    wait_for_listeners(&harness.chain, EventName::TransactionUpdated, 1).await;
    assert_eq!(harness.wallet.listener_count(EventName::TransactionNew), 0);

    harness.chain.emit(&confirmations("0xabc", 2));
    wait_until(|| updates.lock().len() == 1).await;
    {
        let updates = updates.lock();
        assert_eq!(updates[0].1, fresh_key);
        assert_eq!(updates[0].0["0xabc"].status, TransactionStatus::Pending);
        assert_eq!(updates[0].0["0xabc"].confirmations, 2);
    }

    harness.chain.emit(&confirmations("0xabc", 4));

    // The lookup knows no key for this account yet.
    let key = handle.await.unwrap().unwrap();
    assert_eq!(key, KeyRecord::placeholder(LOCK, ACCOUNT));
    assert_eq!(harness.total_listeners(), 0);
}

#[tokio::test]
async fn test_submission_error_fails_session() {
    let harness = Harness::new();
    let (updates, emitter) = recording_emitter();

    let handle = tokio::spawn(track_key_purchase(harness.session(
        ACCOUNT,
        None,
        InMemoryKeyLookup::new(),
        emitter,
    )));
    wait_for_listeners(&harness.wallet, EventName::Error, 1).await;

    harness
        .wallet
        .emit(&WalletEvent::Error(NotifierError::new("user rejected")));

    let result = handle.await.unwrap();
    assert_eq!(
        result,
        Err(TrackerError::SubmissionFailed(NotifierError::new(
            "user rejected"
        )))
    );
    assert!(updates.lock().is_empty());
    assert!(harness.transactions.is_empty());
    assert_eq!(harness.total_listeners(), 0);
}

#[tokio::test]
async fn test_late_events_after_confirmation_are_ignored() {
    let harness = Harness::new();
    harness
        .transactions
        .upsert(stored_purchase("0xabc", ACCOUNT, 0));
    let fresh_key = KeyRecord::new(LOCK, ACCOUNT, unix_timestamp_in(1_000));
    let (updates, emitter) = recording_emitter();

    let handle = tokio::spawn(track_key_purchase(harness.session(
        ACCOUNT,
        Some(fresh_key),
        InMemoryKeyLookup::new(),
        emitter,
    )));
    wait_for_listeners(&harness.chain, EventName::TransactionUpdated, 1).await;
    harness.chain.emit(&confirmations("0xabc", 3));
    assert!(handle.await.unwrap().is_ok());

    let stored = harness.transactions.get("0xabc").unwrap();
    assert_eq!(harness.chain.emit(&confirmations("0xabc", 10)), 0);
    assert_eq!(
        harness
            .chain
            .emit(&ChainEvent::Error(NotifierError::new("late"))),
        0
    );
    assert_eq!(
        harness
            .wallet
            .emit(&WalletEvent::Error(NotifierError::new("late"))),
        0
    );
    assert_eq!(harness.transactions.get("0xabc").unwrap(), stored);
    assert!(updates.lock().is_empty());
}

#[tokio::test]
async fn test_already_confirmed_purchase_resolves_immediately() {
    let harness = Harness::new();
    harness
        .transactions
        .upsert(stored_purchase("0xabc", ACCOUNT, 500));
    let fresh_key = KeyRecord::new(LOCK, ACCOUNT, unix_timestamp_in(1_000));
    let (updates, emitter) = recording_emitter();

    let key = track_key_purchase(harness.session(
        ACCOUNT,
        Some(fresh_key.clone()),
        InMemoryKeyLookup::new(),
        emitter,
    ))
    .await
    .unwrap();

    assert_eq!(key, fresh_key);
    assert!(updates.lock().is_empty());
    assert_eq!(harness.total_listeners(), 0);
}

#[tokio::test]
async fn test_stale_key_ignores_stored_purchase() {
    let harness = Harness::new();
    let mut old = stored_purchase("0xold", ACCOUNT, 1);
    old.status = TransactionStatus::Mined;
    harness.transactions.upsert(old.clone());
    let stale_key = KeyRecord::new(LOCK, ACCOUNT, unix_timestamp_in(-1_000));
    let (updates, emitter) = recording_emitter();

    let handle = tokio::spawn(track_key_purchase(harness.session(
        ACCOUNT,
        Some(stale_key),
        InMemoryKeyLookup::new(),
        emitter,
    )));
    wait_for_listeners(&harness.wallet, EventName::TransactionNew, 1).await;
    assert_eq!(harness.chain.listener_count(EventName::TransactionUpdated), 1);

    // An update for the stored purchase does not touch it.
    assert_eq!(harness.chain.emit(&confirmations("0xold", 10)), 1);

    harness.wallet.emit(&submission("0xnew"));
    wait_until(|| updates.lock().len() == 1).await;
    {
        let updates = updates.lock();
        let (transactions, key) = &updates[0];
        assert_eq!(transactions["0xnew"].status, TransactionStatus::Submitted);
        assert_eq!(transactions["0xold"], old);
        assert_eq!(key, &KeyRecord::placeholder(LOCK, ACCOUNT));
    }

    wait_for_listeners(&harness.chain, EventName::Error, 1).await;
    harness
        .chain
        .emit(&ChainEvent::Error(NotifierError::new("dropped")));
    assert!(matches!(
        handle.await.unwrap(),
        Err(TrackerError::ConfirmationFailed(_))
    ));
    assert_eq!(harness.total_listeners(), 0);
}

#[tokio::test]
async fn test_concurrent_sessions_keep_independent_listeners() {
    let harness = Harness::new();
    let other_account = "0xother";
    harness
        .transactions
        .upsert(stored_purchase("0xfirst", ACCOUNT, 0));
    harness
        .transactions
        .upsert(stored_purchase("0xsecond", other_account, 0));
    let (first_updates, first_emitter) = recording_emitter();
    let (second_updates, second_emitter) = recording_emitter();

    let first = tokio::spawn(track_key_purchase(harness.session(
        ACCOUNT,
        Some(KeyRecord::new(LOCK, ACCOUNT, unix_timestamp_in(1_000))),
        InMemoryKeyLookup::new(),
        first_emitter,
    )));
    let second = tokio::spawn(track_key_purchase(harness.session(
        other_account,
        Some(KeyRecord::new(LOCK, other_account, unix_timestamp_in(1_000))),
        InMemoryKeyLookup::new(),
        second_emitter,
    )));
    wait_for_listeners(&harness.chain, EventName::TransactionUpdated, 2).await;

    harness.chain.emit(&confirmations("0xfirst", 3));
    let key = first.await.unwrap().unwrap();
    assert_eq!(key.owner, ACCOUNT);

    // Only the first session's listeners are gone.
    assert_eq!(harness.chain.listener_count(EventName::TransactionUpdated), 1);
    assert_eq!(harness.chain.listener_count(EventName::Error), 1);

    harness.chain.emit(&confirmations("0xsecond", 1));
    wait_until(|| second_updates.lock().len() == 1).await;
    assert_eq!(
        second_updates.lock()[0].0["0xsecond"].confirmations,
        1
    );

    harness
        .chain
        .emit(&ChainEvent::Error(NotifierError::new("reorg")));
    assert_eq!(
        second.await.unwrap(),
        Err(TrackerError::ConfirmationFailed(NotifierError::new("reorg")))
    );
    assert!(first_updates.lock().is_empty());
    assert_eq!(harness.total_listeners(), 0);
}
