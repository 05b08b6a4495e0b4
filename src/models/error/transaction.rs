use crate::services::KeyLookupError;

use super::NotifierError;
use thiserror::Error;

/// Terminal failure of a purchase tracking session.
///
/// Every variant is surfaced only after the session has detached all of its
/// notifier listeners.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Transaction submission failed: {0}")]
    SubmissionFailed(NotifierError),

    #[error("Transaction confirmation failed: {0}")]
    ConfirmationFailed(NotifierError),

    #[error("Key lookup failed after confirmation: {0}")]
    KeyLookupFailed(#[from] KeyLookupError),

    #[error("Invalid confirmation threshold: {0}")]
    InvalidThreshold(u64),

    #[error("Notifier channel closed before the session resolved")]
    ChannelClosed,
}

impl TrackerError {
    /// Determines if this error is transient (a caller may start a new session)
    /// or permanent.
    ///
    /// **Transient:**
    /// - `SubmissionFailed`: the wallet may accept a second attempt
    /// - `ConfirmationFailed`: chain notifier failures are usually connectivity issues
    /// - `KeyLookupFailed`: delegates to the lookup error
    /// - `ChannelClosed`: notifiers can be recreated
    ///
    /// **Permanent:**
    /// - `InvalidThreshold`: configuration errors won't change on retry
    pub fn is_transient(&self) -> bool {
        match self {
            TrackerError::SubmissionFailed(_) => true,
            TrackerError::ConfirmationFailed(_) => true,
            TrackerError::KeyLookupFailed(err) => err.is_transient(),
            TrackerError::ChannelClosed => true,
            TrackerError::InvalidThreshold(_) => false,
        }
    }
}
