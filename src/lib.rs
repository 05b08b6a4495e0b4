//! Tracks a membership key purchase from wallet submission to network
//! confirmation.
//!
//! A session subscribes to a wallet notifier and a chain notifier, records
//! every observed state of the purchase in a caller-owned
//! [`repositories::TransactionStore`], reports intermediate progress through an
//! [`domain::UpdateEmitter`], and resolves once with the refreshed key or a
//! [`models::TrackerError`].

pub mod config;
pub mod constants;
pub mod domain;
pub mod logging;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
