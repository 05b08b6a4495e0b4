mod logging;
pub use logging::*;

mod transaction;
pub use transaction::*;
