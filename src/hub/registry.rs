//! Listener Registry
//!
//! Ordered callback lists for inbound messages (keyed by event type) and for
//! the connect, disconnect and error lifecycle events. Each registration gets
//! its own [`ListenerId`], so registering the same closure twice yields two
//! independent entries and unsubscribing removes exactly one of them.
//!
//! Emission works on a snapshot of the list taken when the event starts.
//! Listeners may subscribe, unsubscribe or drive the hub while being invoked;
//! such changes apply from the next event on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;

use super::error::HubError;
use super::types::{ConnectionInfo, DisconnectReason};
use crate::sync::lock;

/// Shared callback for events of type `E`
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identity of a single registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Ordered list of handlers for one event
pub struct ListenerList<E> {
    entries: Mutex<Vec<(ListenerId, Handler<E>)>>,
}

impl<E> Default for ListenerList<E> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<E> ListenerList<E> {
    fn push(&self, id: ListenerId, handler: Handler<E>) {
        lock(&self.entries).push((id, handler));
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = lock(&self.entries);
        match entries.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> Vec<Handler<E>> {
        lock(&self.entries).iter().map(|(_, h)| Arc::clone(h)).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every handler in registration order; returns how many ran
    pub fn emit(&self, event: &E) -> usize {
        let handlers = self.snapshot();
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListenerKind {
    Message(String),
    Connect,
    Disconnect,
    Error,
}

/// All listener lists owned by one hub
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    messages: Mutex<HashMap<String, Arc<ListenerList<Value>>>>,
    pub(crate) connect: ListenerList<ConnectionInfo>,
    pub(crate) disconnect: ListenerList<DisconnectReason>,
    pub(crate) error: ListenerList<HubError>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn add_message(self: &Arc<Self>, event_type: &str, handler: Handler<Value>) -> Subscription {
        let id = self.next_id();
        lock(&self.messages)
            .entry(event_type.to_string())
            .or_default()
            .push(id, handler);
        self.subscription(id, ListenerKind::Message(event_type.to_string()))
    }

    pub fn add_connect(self: &Arc<Self>, handler: Handler<ConnectionInfo>) -> Subscription {
        let id = self.next_id();
        self.connect.push(id, handler);
        self.subscription(id, ListenerKind::Connect)
    }

    pub fn add_disconnect(self: &Arc<Self>, handler: Handler<DisconnectReason>) -> Subscription {
        let id = self.next_id();
        self.disconnect.push(id, handler);
        self.subscription(id, ListenerKind::Disconnect)
    }

    pub fn add_error(self: &Arc<Self>, handler: Handler<HubError>) -> Subscription {
        let id = self.next_id();
        self.error.push(id, handler);
        self.subscription(id, ListenerKind::Error)
    }

    fn subscription(self: &Arc<Self>, id: ListenerId, kind: ListenerKind) -> Subscription {
        Subscription {
            id,
            kind,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: ListenerId, kind: &ListenerKind) -> bool {
        match kind {
            ListenerKind::Message(event_type) => {
                let mut messages = lock(&self.messages);
                let Some(list) = messages.get(event_type) else {
                    return false;
                };
                let removed = list.remove(id);
                if list.is_empty() {
                    messages.remove(event_type);
                }
                removed
            }
            ListenerKind::Connect => self.connect.remove(id),
            ListenerKind::Disconnect => self.disconnect.remove(id),
            ListenerKind::Error => self.error.remove(id),
        }
    }

    /// Invoke the handlers registered for `event_type`; returns how many ran
    pub fn emit_message(&self, event_type: &str, payload: &Value) -> usize {
        let list = lock(&self.messages).get(event_type).cloned();
        match list {
            Some(list) => list.emit(payload),
            None => 0,
        }
    }

    /// Number of message handlers registered for `event_type`
    pub fn message_listener_count(&self, event_type: &str) -> usize {
        lock(&self.messages)
            .get(event_type)
            .map(|list| list.len())
            .unwrap_or(0)
    }
}

/// Returned by every registration; call [`unsubscribe`](Subscription::unsubscribe)
/// to remove the handler. Dropping a subscription keeps the handler registered.
#[derive(Debug)]
pub struct Subscription {
    id: ListenerId,
    kind: ListenerKind,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove this registration. Returns false if it was already removed or
    /// the hub is gone.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id, &self.kind),
            None => false,
        }
    }
}
