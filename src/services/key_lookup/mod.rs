//! Lookup of the current key held by an owner on a lock.
//!
//! The tracker queries this once a purchase reaches its confirmation
//! threshold, to refresh the key record the session started from.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

use crate::models::{key_id, KeyRecord};

#[cfg(test)]
use mockall::automock;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum KeyLookupError {
    #[error("Lock not found: {0}")]
    NotFound(String),
    #[error("Key provider error: {0}")]
    Provider(String),
}

impl KeyLookupError {
    /// Determines if this error is transient (can retry) or permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            KeyLookupError::NotFound(_) => false,
            KeyLookupError::Provider(_) => true,
        }
    }
}

#[async_trait]
#[cfg_attr(test, automock)]
pub trait KeyLookup: Send + Sync {
    /// Returns the key `owner` currently holds on `lock_address`. An owner
    /// without a key gets a record with expiration `0`.
    async fn current_key(
        &self,
        lock_address: &str,
        owner: &str,
    ) -> Result<KeyRecord, KeyLookupError>;
}

/// Key lookup backed by a local map of known keys.
#[derive(Debug, Default)]
pub struct InMemoryKeyLookup {
    keys: RwLock<HashMap<String, KeyRecord>>,
}

impl InMemoryKeyLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: KeyRecord) -> Option<KeyRecord> {
        self.keys.write().insert(key.id.clone(), key)
    }
}

#[async_trait]
impl KeyLookup for InMemoryKeyLookup {
    async fn current_key(
        &self,
        lock_address: &str,
        owner: &str,
    ) -> Result<KeyRecord, KeyLookupError> {
        Ok(self
            .keys
            .read()
            .get(&key_id(lock_address, owner))
            .cloned()
            .unwrap_or_else(|| KeyRecord::placeholder(lock_address, owner)))
    }
}
