//! # Services Module
//!
//! External collaborators of a tracking session: the wallet and chain
//! notifiers and the key lookup.

mod key_lookup;
pub use key_lookup::*;

mod notifier;
pub use notifier::*;
