//! # Repository Module
//!
//! In-memory state shared between a caller and the sessions it starts.

pub mod transaction;
pub use transaction::*;
