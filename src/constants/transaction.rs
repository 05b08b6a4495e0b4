//! Transaction tracking constants

/// Block number stored on a snapshot until the chain reports a real block.
/// Sorts after every real block number, so an unmined submission is always
/// the most recent snapshot for its key.
pub const UNKNOWN_BLOCK_NUMBER: u64 = u64::MAX;

/// Confirmations required before a purchase is considered final when the
/// caller does not configure a threshold.
pub const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 12;

/// Chain id used when none is configured (Ethereum mainnet).
pub const DEFAULT_NETWORK_ID: u64 = 1;

/// Expiration value of a key that has never been purchased.
pub const NO_KEY_EXPIRATION: i64 = 0;
