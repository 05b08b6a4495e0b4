use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumString};

/// Snapshots keyed by transaction hash.
pub type TransactionMap = HashMap<String, TransactionSnapshot>;

/// Qualitative progress of a tracked transaction.
///
/// Variants are declared in lifecycle order, so `Ord` reflects how far a
/// transaction has advanced.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionStatus {
    Submitted,
    Pending,
    Mined,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    KeyPurchase,
    LockCreation,
    Withdrawal,
    UpdateKeyPrice,
    ApproveBeneficiary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSnapshot {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub input: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub confirmations: u64,
    pub network: u64,
    pub block_number: u64,
    /// Logical id of the key this transaction purchases.
    pub key: String,
    pub lock: String,
}

impl TransactionSnapshot {
    /// Overwrites the fields present in `update`, leaving the rest untouched.
    pub fn apply_update(&mut self, update: &TransactionUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(block_number) = update.block_number {
            self.block_number = block_number;
        }
        if let Some(confirmations) = update.confirmations {
            self.confirmations = confirmations;
        }
    }
}

/// Partial state reported by the chain notifier for one hash.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
}

impl TransactionUpdate {
    /// Folds a later update into this one. Fields present in `later` win.
    pub fn merge(&mut self, later: &TransactionUpdate) {
        if later.status.is_some() {
            self.status = later.status;
        }
        if later.block_number.is_some() {
            self.block_number = later.block_number;
        }
        if later.confirmations.is_some() {
            self.confirmations = later.confirmations;
        }
    }
}
