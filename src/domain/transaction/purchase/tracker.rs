//! State machine following one key purchase from wallet submission to the
//! confirmation threshold.
//!
//! The machine is synchronous and free of I/O: [`PurchaseTracker::start`]
//! picks the initial state from the cached key and the transaction store, and
//! [`PurchaseTracker::step`] folds one notifier event into the store. The
//! session driver owns listener registration and decides what to do with each
//! [`StepOutcome`].

use std::collections::HashMap;

use crate::constants::UNKNOWN_BLOCK_NUMBER;
use crate::domain::transaction::common::{
    confirmation_status, has_enough_confirmations, is_key_fresh, merge_status,
};
use crate::models::{
    key_id, KeyRecord, TrackerError, TransactionSnapshot, TransactionStatus, TransactionType,
    TransactionUpdate,
};
use crate::repositories::TransactionStore;
use crate::services::{ChainEvent, SubmissionEvent, WalletEvent};
use tracing::{debug, info, warn};

/// Who is purchasing which key, on which network, and when it counts as final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseContext {
    pub lock_address: String,
    pub account: String,
    pub network_id: u64,
    pub required_confirmations: u64,
}

impl PurchaseContext {
    pub fn key_id(&self) -> String {
        key_id(&self.lock_address, &self.account)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseState {
    Init,
    AwaitingSubmission,
    AwaitingConfirmation { hash: String },
    Confirmed,
    Failed(TrackerError),
}

impl PurchaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseState::Confirmed | PurchaseState::Failed(_))
    }
}

/// Where a session begins.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    AwaitSubmission,
    AwaitConfirmation(String),
    /// The tracked purchase already met the threshold before the session began.
    AlreadyConfirmed,
    /// The tracker was started before and has already failed.
    AlreadyFailed(TrackerError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Wallet(WalletEvent),
    Chain(ChainEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The store changed and the caller should be notified.
    Updated,
    /// The event does not apply to the current state.
    Ignored,
    /// The confirmation threshold was reached.
    Confirmed,
    Failed(TrackerError),
}

pub struct PurchaseTracker {
    context: PurchaseContext,
    starting_key: Option<KeyRecord>,
    key_is_fresh: bool,
    transactions: TransactionStore,
    state: PurchaseState,
    /// Chain updates seen while no hash is tracked yet, merged per hash.
    early_updates: HashMap<String, TransactionUpdate>,
}

impl PurchaseTracker {
    pub fn new(
        context: PurchaseContext,
        starting_key: Option<KeyRecord>,
        transactions: TransactionStore,
    ) -> Self {
        Self {
            context,
            starting_key,
            key_is_fresh: false,
            transactions,
            state: PurchaseState::Init,
            early_updates: HashMap::new(),
        }
    }

    pub fn state(&self) -> &PurchaseState {
        &self.state
    }

    pub fn context(&self) -> &PurchaseContext {
        &self.context
    }

    /// Hash being confirmed, once one is known.
    pub fn tracked_hash(&self) -> Option<&str> {
        match &self.state {
            PurchaseState::AwaitingConfirmation { hash } => Some(hash),
            _ => None,
        }
    }

    /// Key paired with every update: the starting key if it was still valid
    /// when the session began, otherwise a placeholder with no expiration.
    pub fn best_known_key(&self) -> KeyRecord {
        self.starting_key
            .as_ref()
            .filter(|_| self.key_is_fresh)
            .cloned()
            .unwrap_or_else(|| {
                KeyRecord::placeholder(&self.context.lock_address, &self.context.account)
            })
    }

    /// Leaves `Init`. A fresh key with a purchase already in the store resumes
    /// confirmation tracking of that purchase; anything else waits for a new
    /// submission.
    pub fn start(&mut self, now: i64) -> StartOutcome {
        if self.state != PurchaseState::Init {
            warn!(state = ?self.state, "purchase tracker already started");
            return match &self.state {
                PurchaseState::AwaitingConfirmation { hash } => {
                    StartOutcome::AwaitConfirmation(hash.clone())
                }
                PurchaseState::Confirmed => StartOutcome::AlreadyConfirmed,
                PurchaseState::Failed(err) => StartOutcome::AlreadyFailed(err.clone()),
                PurchaseState::Init | PurchaseState::AwaitingSubmission => {
                    StartOutcome::AwaitSubmission
                }
            };
        }

        self.key_is_fresh = is_key_fresh(self.starting_key.as_ref(), now);
        let existing = if self.key_is_fresh {
            self.transactions
                .find_latest_for_key(&self.context.key_id(), TransactionType::KeyPurchase)
        } else {
            None
        };

        match existing {
            Some(tx)
                if has_enough_confirmations(
                    tx.confirmations,
                    self.context.required_confirmations,
                ) =>
            {
                info!(
                    hash = %tx.hash,
                    confirmations = tx.confirmations,
                    "purchase already confirmed"
                );
                self.state = PurchaseState::Confirmed;
                StartOutcome::AlreadyConfirmed
            }
            Some(tx) => {
                debug!(hash = %tx.hash, "resuming confirmation tracking");
                self.state = PurchaseState::AwaitingConfirmation {
                    hash: tx.hash.clone(),
                };
                StartOutcome::AwaitConfirmation(tx.hash)
            }
            None => {
                debug!(
                    key_is_fresh = self.key_is_fresh,
                    "waiting for purchase submission"
                );
                self.state = PurchaseState::AwaitingSubmission;
                StartOutcome::AwaitSubmission
            }
        }
    }

    /// Folds one notifier event into the store and advances the state.
    pub fn step(&mut self, event: TrackerEvent) -> StepOutcome {
        let state = self.state.clone();
        match (state, event) {
            (
                PurchaseState::AwaitingSubmission,
                TrackerEvent::Wallet(WalletEvent::Submission(submission)),
            ) => self.on_submission(submission),
            (
                PurchaseState::AwaitingSubmission,
                TrackerEvent::Chain(ChainEvent::Updated { hash, update }),
            ) => {
                debug!(hash = %hash, "holding chain update until submission");
                self.early_updates.entry(hash).or_default().merge(&update);
                StepOutcome::Ignored
            }
            (PurchaseState::AwaitingSubmission, TrackerEvent::Wallet(WalletEvent::Error(err))) => {
                warn!(error = %err, "purchase submission failed");
                let err = TrackerError::SubmissionFailed(err);
                self.state = PurchaseState::Failed(err.clone());
                StepOutcome::Failed(err)
            }
            (
                PurchaseState::AwaitingConfirmation { hash: tracked },
                TrackerEvent::Chain(ChainEvent::Updated { hash, update }),
            ) if tracked == hash => self.on_update(hash, update),
            (
                PurchaseState::AwaitingConfirmation { hash },
                TrackerEvent::Chain(ChainEvent::Error(err)),
            ) => {
                warn!(hash = %hash, error = %err, "purchase confirmation failed");
                let err = TrackerError::ConfirmationFailed(err);
                self.state = PurchaseState::Failed(err.clone());
                StepOutcome::Failed(err)
            }
            (state, event) => {
                debug!(state = ?state, event = ?event, "ignoring event");
                StepOutcome::Ignored
            }
        }
    }

    fn on_submission(&mut self, submission: SubmissionEvent) -> StepOutcome {
        let tx = TransactionSnapshot {
            hash: submission.hash,
            from: submission.from,
            to: submission.to,
            input: submission.input,
            transaction_type: submission.transaction_type,
            status: TransactionStatus::Submitted,
            confirmations: 0,
            network: self.context.network_id,
            block_number: UNKNOWN_BLOCK_NUMBER,
            key: self.context.key_id(),
            lock: self.context.lock_address.clone(),
        };
        info!(hash = %tx.hash, lock = %tx.lock, "purchase submitted");

        let hash = tx.hash.clone();
        self.state = PurchaseState::AwaitingConfirmation { hash: hash.clone() };
        self.transactions.upsert(tx);

        let early = self.early_updates.remove(&hash);
        self.early_updates.clear();
        match early {
            Some(update) => {
                debug!(hash = %hash, "replaying chain update received before submission");
                self.on_update(hash, update)
            }
            None => StepOutcome::Updated,
        }
    }

    fn on_update(&mut self, hash: String, update: TransactionUpdate) -> StepOutcome {
        let required_confirmations = self.context.required_confirmations;
        let Some(tx) = self.transactions.update(&hash, |tx| {
            tx.apply_update(&update);
            let computed =
                confirmation_status(tx.confirmations, tx.block_number, required_confirmations);
            tx.status = merge_status(tx.status, computed);
        }) else {
            warn!(hash = %hash, "tracked transaction missing from store");
            return StepOutcome::Ignored;
        };

        if tx.status == TransactionStatus::Mined
            && has_enough_confirmations(tx.confirmations, required_confirmations)
        {
            info!(hash = %hash, confirmations = tx.confirmations, "purchase confirmed");
            self.state = PurchaseState::Confirmed;
            return StepOutcome::Confirmed;
        }

        debug!(
            hash = %hash,
            status = %tx.status,
            confirmations = tx.confirmations,
            "purchase progressed"
        );
        StepOutcome::Updated
    }
}
