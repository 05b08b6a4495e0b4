//! Key purchase tracking: the state machine and the async session that
//! drives it from notifier events.

mod tracker;
pub use tracker::*;

mod session;
pub use session::*;
