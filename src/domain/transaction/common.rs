//! Pure status and freshness policies used by purchase tracking.
//!
//! Nothing here performs I/O or reads the clock; callers pass the current
//! time in so every decision is reproducible in tests.

use crate::constants::UNKNOWN_BLOCK_NUMBER;
use crate::models::{KeyRecord, TransactionStatus};

/// Checks whether a transaction has reached the confirmation threshold.
/// The comparison is inclusive.
pub fn has_enough_confirmations(confirmations: u64, required_confirmations: u64) -> bool {
    confirmations >= required_confirmations
}

/// Computes the status of a transaction from its raw chain state.
///
/// # Arguments
///
/// * `confirmations` - Blocks mined on top of the transaction's block
/// * `block_number` - Block containing the transaction, or [`UNKNOWN_BLOCK_NUMBER`]
/// * `required_confirmations` - Threshold at which the transaction is final
///
/// # Returns
///
/// `Mined` once the threshold is met, `Submitted` while the chain has not seen
/// the transaction at all, `Pending` otherwise.
pub fn confirmation_status(
    confirmations: u64,
    block_number: u64,
    required_confirmations: u64,
) -> TransactionStatus {
    if has_enough_confirmations(confirmations, required_confirmations) {
        TransactionStatus::Mined
    } else if confirmations == 0 && block_number == UNKNOWN_BLOCK_NUMBER {
        TransactionStatus::Submitted
    } else {
        TransactionStatus::Pending
    }
}

/// Combines the status reported by the chain notifier with the computed one.
/// A transaction never appears less advanced than either source says.
pub fn merge_status(reported: TransactionStatus, computed: TransactionStatus) -> TransactionStatus {
    reported.max(computed)
}

/// Checks if a cached key is still valid at `now` (unix seconds).
///
/// A key expiring exactly at `now` is expired.
pub fn is_key_fresh(key: Option<&KeyRecord>, now: i64) -> bool {
    key.is_some_and(|key| key.expiration > now)
}
