//! # Domain Module
//!
//! Core domain logic of the tracker:
//!
//! * Confirmation and key freshness policies
//! * The purchase state machine and its session driver

pub mod transaction;
pub use transaction::*;
