use crate::constants::NO_KEY_EXPIRATION;
use serde::{Deserialize, Serialize};

/// A membership key as currently known for one (lock, owner) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRecord {
    pub id: String,
    pub lock: String,
    pub owner: String,
    /// Unix seconds. `0` means no key has been purchased yet.
    pub expiration: i64,
}

impl KeyRecord {
    pub fn new(lock: &str, owner: &str, expiration: i64) -> Self {
        Self {
            id: key_id(lock, owner),
            lock: lock.to_string(),
            owner: owner.to_string(),
            expiration,
        }
    }

    /// Key record for a pair that does not hold a key yet.
    pub fn placeholder(lock: &str, owner: &str) -> Self {
        Self::new(lock, owner, NO_KEY_EXPIRATION)
    }
}

/// Logical key identifier for a lock and owner.
pub fn key_id(lock: &str, owner: &str) -> String {
    format!("{lock}-{owner}")
}
