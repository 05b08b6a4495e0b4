pub mod common;
pub use common::*;

pub mod purchase;
pub use purchase::*;
