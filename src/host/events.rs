//! Subscriber registry for unsolicited host events.
//!
//! Transports call [`EventHub::dispatch`] for every [`EventEnvelope`] they
//! receive. Handlers registered for that event name run synchronously on the
//! dispatching task, in subscription order.

use crate::host::contract::EventEnvelope;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Callback invoked with each matching event.
pub type EventHandler = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<(u64, EventHandler)>>>,
}

/// Shared registry of event handlers. Cheap to clone.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.inner.handlers.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("EventHub")
            .field("events", &handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events named `event`.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event.to_owned())
            .or_default()
            .push((id, Arc::new(handler)));
        tracing::debug!(event, subscription = id, "host event subscriber added");
        Subscription {
            hub: Arc::downgrade(&self.inner),
            event: event.to_owned(),
            id,
        }
    }

    /// Invoke every handler subscribed to `envelope.event`.
    ///
    /// Returns the number of handlers invoked. The registry lock is released
    /// before handlers run, so handlers may subscribe or unsubscribe.
    pub fn dispatch(&self, envelope: &EventEnvelope) -> usize {
        let handlers: Vec<EventHandler> = {
            let guard = self.inner.handlers.lock().unwrap_or_else(|e| e.into_inner());
            match guard.get(&envelope.event) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => Vec::new(),
            }
        };
        if handlers.is_empty() {
            tracing::trace!(event = %envelope.event, "no subscribers for host event");
        }
        for handler in &handlers {
            handler(envelope);
        }
        handlers.len()
    }

    /// Number of live subscribers for `event`.
    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(event)
            .map_or(0, Vec::len)
    }
}

/// Handle for a registered event handler.
///
/// Unsubscribing is idempotent, and safe after the hub itself is gone.
/// Dropping the handle unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    hub: Weak<HubInner>,
    event: String,
    id: u64,
}

impl Subscription {
    /// Event name this subscription listens to.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn unsubscribe(&self) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        let mut handlers = hub.handlers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = handlers.get_mut(&self.event) {
            let before = list.len();
            list.retain(|(id, _)| *id != self.id);
            if list.len() != before {
                tracing::debug!(event = %self.event, subscription = self.id, "host event subscriber removed");
            }
            if list.is_empty() {
                handlers.remove(&self.event);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
