//! Event payloads emitted by the wallet and chain notifiers.
//!
//! Each payload type knows the event name it is published under, so a single
//! [`Notifier`](super::Notifier) can route a payload to the listeners that
//! subscribed by name.

use crate::models::{NotifierError, TransactionStatus, TransactionType, TransactionUpdate};
use strum::{AsRefStr, Display};

/// Names under which notifier events are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum EventName {
    /// A transaction was accepted by the wallet layer.
    #[strum(serialize = "transaction.new")]
    TransactionNew,
    /// The chain reported new state for a transaction.
    #[strum(serialize = "transaction.updated")]
    TransactionUpdated,
    #[strum(serialize = "error")]
    Error,
}

/// Payload that can be published through a [`Notifier`](super::Notifier).
pub trait NotifierEvent {
    fn name(&self) -> EventName;
}

/// Transaction accepted by the wallet, before any chain confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionEvent {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub input: String,
    pub transaction_type: TransactionType,
    /// Status as reported by the wallet. Tracking always starts from
    /// `Submitted` regardless of this value.
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletEvent {
    Submission(SubmissionEvent),
    Error(NotifierError),
}

impl NotifierEvent for WalletEvent {
    fn name(&self) -> EventName {
        match self {
            WalletEvent::Submission(_) => EventName::TransactionNew,
            WalletEvent::Error(_) => EventName::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    Updated {
        hash: String,
        update: TransactionUpdate,
    },
    Error(NotifierError),
}

impl NotifierEvent for ChainEvent {
    fn name(&self) -> EventName {
        match self {
            ChainEvent::Updated { .. } => EventName::TransactionUpdated,
            ChainEvent::Error(_) => EventName::Error,
        }
    }
}
