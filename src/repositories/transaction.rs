use crate::models::{TransactionMap, TransactionSnapshot, TransactionType};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared in-memory map from transaction hash to its latest snapshot.
///
/// Cloning yields another handle to the same map. The caller keeps one handle
/// for the lifetime of a session while the tracker writes through its own.
#[derive(Debug, Clone, Default)]
pub struct TransactionStore {
    store: Arc<RwLock<TransactionMap>>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(transactions: TransactionMap) -> Self {
        Self {
            store: Arc::new(RwLock::new(transactions)),
        }
    }

    pub fn get(&self, hash: &str) -> Option<TransactionSnapshot> {
        self.store.read().get(hash).cloned()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.store.read().contains_key(hash)
    }

    /// Stores `tx` under its hash, replacing any previous snapshot whole.
    pub fn upsert(&self, tx: TransactionSnapshot) -> Option<TransactionSnapshot> {
        self.store.write().insert(tx.hash.clone(), tx)
    }

    /// Applies `f` to the stored snapshot for `hash` and returns the result.
    pub fn update<F>(&self, hash: &str, f: F) -> Option<TransactionSnapshot>
    where
        F: FnOnce(&mut TransactionSnapshot),
    {
        let mut store = self.store.write();
        let tx = store.get_mut(hash)?;
        f(tx);
        Some(tx.clone())
    }

    /// Most recent snapshot of the given type purchasing `key_id`, by block number.
    pub fn find_latest_for_key(
        &self,
        key_id: &str,
        transaction_type: TransactionType,
    ) -> Option<TransactionSnapshot> {
        self.store
            .read()
            .values()
            .filter(|tx| tx.key == key_id && tx.transaction_type == transaction_type)
            .max_by_key(|tx| tx.block_number)
            .cloned()
    }

    /// Copy of the full map, as handed to the update emitter.
    pub fn snapshot(&self) -> TransactionMap {
        self.store.read().clone()
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }
}

impl From<TransactionMap> for TransactionStore {
    fn from(transactions: TransactionMap) -> Self {
        Self::from_map(transactions)
    }
}
