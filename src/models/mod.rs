mod error;
pub use error::*;

mod key;
pub use key::*;

mod transaction;
pub use transaction::*;
