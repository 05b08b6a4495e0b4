mod notifier;
pub use notifier::*;

mod transaction;
pub use transaction::*;
