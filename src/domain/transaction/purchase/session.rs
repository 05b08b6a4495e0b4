//! Async driver for one purchase tracking session.
//!
//! The driver registers the notifier listeners a [`PurchaseTracker`] state
//! needs, forwards every delivered event through a channel so events are
//! processed one at a time in arrival order, and tears listeners down on every
//! path that leaves a state. The returned future resolves only on a terminal
//! transition.
//!
//! While waiting for a submission the chain listeners are already registered,
//! so a chain update fired right after the submission is queued behind it
//! instead of reaching no listener.

use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, trace, warn};

use super::tracker::{PurchaseContext, PurchaseTracker, StartOutcome, StepOutcome, TrackerEvent};
use crate::models::{KeyRecord, TrackerError, TransactionMap};
use crate::repositories::TransactionStore;
use crate::services::{ChainEvent, EventName, KeyLookup, Notifier, Subscription, WalletEvent};
use crate::utils::current_unix_timestamp;

/// Receives the transaction map and best known key after every non-terminal
/// change. Never called once the session has resolved.
pub trait UpdateEmitter: Send {
    fn emit(&mut self, transactions: &TransactionMap, key: &KeyRecord);
}

impl<F> UpdateEmitter for F
where
    F: FnMut(&TransactionMap, &KeyRecord) + Send,
{
    fn emit(&mut self, transactions: &TransactionMap, key: &KeyRecord) {
        self(transactions, key)
    }
}

/// Everything one tracking session needs. The account and network are passed
/// explicitly so concurrent sessions never share hidden state.
pub struct PurchaseSession<K, U> {
    pub wallet: Notifier<WalletEvent>,
    pub chain: Notifier<ChainEvent>,
    pub transactions: TransactionStore,
    pub starting_key: Option<KeyRecord>,
    pub lock_address: String,
    pub account: String,
    pub network_id: u64,
    pub required_confirmations: u64,
    pub key_lookup: K,
    pub update: U,
}

#[derive(Default)]
struct SessionListeners {
    submission: Option<Subscription<WalletEvent>>,
    submission_error: Option<Subscription<WalletEvent>>,
    update: Option<Subscription<ChainEvent>>,
    confirmation_error: Option<Subscription<ChainEvent>>,
}

impl SessionListeners {
    fn watch_wallet(
        &mut self,
        wallet: &Notifier<WalletEvent>,
        sender: &UnboundedSender<TrackerEvent>,
    ) {
        self.submission = Some(wallet.subscribe_once(
            EventName::TransactionNew,
            forward(sender, TrackerEvent::Wallet),
        ));
        self.submission_error = Some(
            wallet.subscribe_once(EventName::Error, forward(sender, TrackerEvent::Wallet)),
        );
    }

    /// Forwards chain updates for `tracked` only, or for every hash while the
    /// purchase hash is still unknown.
    fn watch_chain(
        &mut self,
        chain: &Notifier<ChainEvent>,
        sender: &UnboundedSender<TrackerEvent>,
        tracked: Option<&str>,
    ) {
        let tracked = tracked.map(str::to_string);
        let mut deliver = forward(sender, TrackerEvent::Chain);
        self.update = Some(chain.subscribe(EventName::TransactionUpdated, move |event| {
            let wanted = match (&tracked, event) {
                (Some(tracked), ChainEvent::Updated { hash, .. }) => hash == tracked,
                _ => true,
            };
            if wanted {
                deliver(event);
            }
        }));
        // Errors before a hash is known are dropped by the tracker, so this
        // one stays registered until the session ends.
        self.confirmation_error = Some(
            chain.subscribe(EventName::Error, forward(sender, TrackerEvent::Chain)),
        );
    }

    fn is_watching_wallet(&self) -> bool {
        self.submission.is_some() || self.submission_error.is_some()
    }

    fn cancel_wallet(&mut self) {
        cancel(&mut self.submission);
        cancel(&mut self.submission_error);
    }

    fn cancel_chain(&mut self) {
        cancel(&mut self.update);
        cancel(&mut self.confirmation_error);
    }

    fn cancel_all(&mut self) {
        self.cancel_wallet();
        self.cancel_chain();
    }
}

fn cancel<E>(subscription: &mut Option<Subscription<E>>) {
    if let Some(subscription) = subscription.take() {
        subscription.cancel();
    }
}

fn forward<E: Clone + 'static>(
    sender: &UnboundedSender<TrackerEvent>,
    wrap: fn(E) -> TrackerEvent,
) -> impl FnMut(&E) + Send + 'static {
    let sender = sender.clone();
    move |event: &E| {
        if sender.send(wrap(event.clone())).is_err() {
            trace!("purchase session closed, dropping event");
        }
    }
}

/// Tracks one key purchase until it is confirmed or fails.
///
/// Resolves with the key returned by the key lookup once the purchase reaches
/// the confirmation threshold, or with the starting key when the purchase was
/// already confirmed before the session began. All listeners are detached
/// before the future resolves, on success and on error.
pub async fn track_key_purchase<K, U>(
    session: PurchaseSession<K, U>,
) -> Result<KeyRecord, TrackerError>
where
    K: KeyLookup,
    U: UpdateEmitter,
{
    let PurchaseSession {
        wallet,
        chain,
        transactions,
        starting_key,
        lock_address,
        account,
        network_id,
        required_confirmations,
        key_lookup,
        mut update,
    } = session;

    if required_confirmations == 0 {
        return Err(TrackerError::InvalidThreshold(required_confirmations));
    }

    info!(
        lock = %lock_address,
        account = %account,
        network = network_id,
        required_confirmations,
        "tracking key purchase"
    );
    let context = PurchaseContext {
        lock_address,
        account,
        network_id,
        required_confirmations,
    };
    let mut tracker = PurchaseTracker::new(context, starting_key, transactions.clone());

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let mut listeners = SessionListeners::default();

    match tracker.start(current_unix_timestamp()) {
        StartOutcome::AlreadyConfirmed => return Ok(tracker.best_known_key()),
        StartOutcome::AlreadyFailed(err) => return Err(err),
        StartOutcome::AwaitSubmission => {
            listeners.watch_wallet(&wallet, &sender);
            listeners.watch_chain(&chain, &sender, None);
        }
        StartOutcome::AwaitConfirmation(hash) => {
            listeners.watch_chain(&chain, &sender, Some(&hash))
        }
    }
    // Only listeners hold senders from here on, so the channel closes if they
    // are all removed from outside the session.
    drop(sender);

    while let Some(event) = receiver.recv().await {
        match tracker.step(event) {
            StepOutcome::Ignored => {}
            StepOutcome::Updated => {
                if listeners.is_watching_wallet() && tracker.tracked_hash().is_some() {
                    listeners.cancel_wallet();
                }
                update.emit(&transactions.snapshot(), &tracker.best_known_key());
            }
            StepOutcome::Confirmed => {
                listeners.cancel_all();
                let context = tracker.context();
                let key = key_lookup
                    .current_key(&context.lock_address, &context.account)
                    .await?;
                debug!(key = %key.id, expiration = key.expiration, "refreshed key after confirmation");
                return Ok(key);
            }
            StepOutcome::Failed(err) => {
                listeners.cancel_all();
                return Err(err);
            }
        }
    }

    listeners.cancel_all();
    warn!("notifier listeners removed before the purchase resolved");
    Err(TrackerError::ChannelClosed)
}
