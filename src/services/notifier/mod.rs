//! Publish/subscribe channel standing in for the wallet and chain notifiers.
//!
//! A [`Notifier`] keeps an ordered list of listeners, each registered under an
//! [`EventName`] either persistently or for a single delivery. Registration
//! returns a [`Subscription`] handle that removes exactly its own listener when
//! cancelled or dropped, so concurrent sessions sharing a notifier never
//! remove each other's listeners.
//!
//! Handlers are invoked outside the registry lock. A handler may therefore
//! subscribe, cancel, or emit on the same notifier. A nested emit skips any
//! handler that is still running further up the same thread's stack.

mod events;
pub use events::*;

use parking_lot::{Mutex, ReentrantMutex};
use std::cell::RefCell;
use std::sync::{Arc, Weak};
use tracing::trace;

type BoxedHandler<E> = Box<dyn FnMut(&E) + Send>;

/// Emits from other threads wait on the mutex. A nested emit on the thread
/// already running the handler finds the cell borrowed.
type Handler<E> = Arc<ReentrantMutex<RefCell<BoxedHandler<E>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionMode {
    /// Removed before its first invocation.
    Once,
    /// Stays registered until cancelled.
    Persistent,
}

struct Listener<E> {
    id: u64,
    event: EventName,
    mode: SubscriptionMode,
    handler: Handler<E>,
}

struct Registry<E> {
    next_id: u64,
    listeners: Vec<Listener<E>>,
}

impl<E> Registry<E> {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }
}

/// Cloneable handle to a shared listener registry.
pub struct Notifier<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E> Clone for Notifier<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }
}

impl<E> Notifier<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every future `event` until the returned
    /// subscription is cancelled or dropped.
    pub fn subscribe<F>(&self, event: EventName, handler: F) -> Subscription<E>
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.register(event, SubscriptionMode::Persistent, handler)
    }

    /// Registers `handler` for the next `event` only.
    pub fn subscribe_once<F>(&self, event: EventName, handler: F) -> Subscription<E>
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.register(event, SubscriptionMode::Once, handler)
    }

    fn register<F>(&self, event: EventName, mode: SubscriptionMode, handler: F) -> Subscription<E>
    where
        F: FnMut(&E) + Send + 'static,
    {
        let handler: BoxedHandler<E> = Box::new(handler);
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push(Listener {
            id,
            event,
            mode,
            handler: Arc::new(ReentrantMutex::new(RefCell::new(handler))),
        });
        trace!(event = %event, id, ?mode, "listener registered");

        Subscription {
            id,
            event,
            registry: Some(Arc::downgrade(&self.registry)),
        }
    }

    /// Removes every listener registered under `event`, returning how many
    /// were removed.
    pub fn unsubscribe(&self, event: EventName) -> usize {
        let mut registry = self.registry.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|listener| listener.event != event);
        before - registry.listeners.len()
    }

    pub fn listener_count(&self, event: EventName) -> usize {
        self.registry
            .lock()
            .listeners
            .iter()
            .filter(|listener| listener.event == event)
            .count()
    }
}

impl<E: NotifierEvent> Notifier<E> {
    /// Delivers `payload` to the listeners of its event, in registration
    /// order. Returns the number of handlers invoked, which excludes handlers
    /// skipped because they are already running.
    pub fn emit(&self, payload: &E) -> usize {
        let event = payload.name();
        let handlers: Vec<Handler<E>> = {
            let mut registry = self.registry.lock();
            let handlers = registry
                .listeners
                .iter()
                .filter(|listener| listener.event == event)
                .map(|listener| Arc::clone(&listener.handler))
                .collect();
            registry.listeners.retain(|listener| {
                !(listener.event == event && listener.mode == SubscriptionMode::Once)
            });
            handlers
        };

        let mut delivered = 0;
        for handler in &handlers {
            let guard = handler.lock();
            let Ok(mut handler) = guard.try_borrow_mut() else {
                trace!(event = %event, "handler already running, skipping nested delivery");
                continue;
            };
            (*handler)(payload);
            delivered += 1;
        }
        trace!(event = %event, delivered, "event emitted");
        delivered
    }
}

/// Handle to one registered listener.
///
/// Dropping the handle cancels the listener.
pub struct Subscription<E> {
    id: u64,
    event: EventName,
    registry: Option<Weak<Mutex<Registry<E>>>>,
}

impl<E> Subscription<E> {
    pub fn event(&self) -> EventName {
        self.event
    }

    /// Whether the listener is still registered. A once listener stops being
    /// active as soon as its event fires.
    pub fn is_active(&self) -> bool {
        self.registry
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|registry| {
                registry
                    .lock()
                    .listeners
                    .iter()
                    .any(|listener| listener.id == self.id)
            })
            .unwrap_or(false)
    }

    /// Removes the listener. Returns `true` if it was still registered.
    pub fn cancel(mut self) -> bool {
        self.detach()
    }

    fn detach(&mut self) -> bool {
        let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) else {
            return false;
        };
        let removed = registry.lock().remove(self.id);
        if removed {
            trace!(event = %self.event, id = self.id, "listener removed");
        }
        removed
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .finish()
    }
}
