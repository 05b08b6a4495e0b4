//! Builders and polling helpers for driving purchase sessions from tests.

use key_purchase_tracker::{
    domain::{PurchaseSession, UpdateEmitter},
    models::{KeyRecord, TransactionMap, TransactionStatus, TransactionType},
    repositories::TransactionStore,
    services::{ChainEvent, EventName, InMemoryKeyLookup, Notifier, SubmissionEvent, WalletEvent},
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const LOCK: &str = "0xlock";
pub const ACCOUNT: &str = "0xaccount";

pub type Updates = Arc<Mutex<Vec<(TransactionMap, KeyRecord)>>>;

pub fn recording_emitter() -> (Updates, impl UpdateEmitter + 'static) {
    let updates: Updates = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&updates);
    (
        updates,
        move |transactions: &TransactionMap, key: &KeyRecord| {
            recorded.lock().push((transactions.clone(), key.clone()))
        },
    )
}

pub fn submission(hash: &str) -> WalletEvent {
    WalletEvent::Submission(SubmissionEvent {
        hash: hash.to_string(),
        from: ACCOUNT.to_string(),
        to: LOCK.to_string(),
        input: "0xdata".to_string(),
        transaction_type: TransactionType::KeyPurchase,
        status: TransactionStatus::Pending,
    })
}

#[derive(Default)]
pub struct Harness {
    pub wallet: Notifier<WalletEvent>,
    pub chain: Notifier<ChainEvent>,
    pub transactions: TransactionStore,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session<U: UpdateEmitter>(
        &self,
        account: &str,
        starting_key: Option<KeyRecord>,
        key_lookup: InMemoryKeyLookup,
        update: U,
    ) -> PurchaseSession<InMemoryKeyLookup, U> {
        PurchaseSession {
            wallet: self.wallet.clone(),
            chain: self.chain.clone(),
            transactions: self.transactions.clone(),
            starting_key,
            lock_address: LOCK.to_string(),
            account: account.to_string(),
            network_id: 1337,
            required_confirmations: 3,
            key_lookup,
            update,
        }
    }

    pub fn total_listeners(&self) -> usize {
        self.wallet.listener_count(EventName::TransactionNew)
            + self.wallet.listener_count(EventName::Error)
            + self.chain.listener_count(EventName::TransactionUpdated)
            + self.chain.listener_count(EventName::Error)
    }
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition was never met");
}

pub async fn wait_for_listeners<E>(notifier: &Notifier<E>, event: EventName, count: usize) {
    wait_until(|| notifier.listener_count(event) == count).await
}
