//! Generic service, listener and connector abstractions.
//!
//! A [Service] is a keyed store of entities that notifies registered listeners whenever
//! an entity is ingested. A [Listener] consumes another service's notifications and
//! typically forwards them into a downstream service, which is how the dataflow graph is
//! built. A [Connector] sits at the boundary and pushes entities out to a byte channel.
//!
//! Listeners are shared as `Rc<RefCell<..>>` handles so an edge in the graph never owns
//! the node it points at. Notification is synchronous and runs listeners in registration
//! order; a call to `on_message` returns only after the full transitive downstream
//! propagation has completed.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no value cached for key {0:?}")]
    NotFound(String),
}

/// Consumer of a service's notifications.
///
/// Only `on_add` is exercised by the pipeline graph; the other callbacks exist for
/// listeners that track removals or in-place updates and default to no-ops.
pub trait Listener<V> {
    fn on_add(&mut self, data: &V);

    fn on_remove(&mut self, _data: &V) {}

    fn on_update(&mut self, _data: &V) {}
}

pub type ListenerRef<V> = Rc<RefCell<dyn Listener<V>>>;

/// Keyed store of entities with synchronous listener fan-out.
pub trait Service<K: ?Sized, V> {
    /// Ingest point called by inbound connectors and upstream bridges. Overwrites the
    /// cache entry for the entity's key and notifies every listener.
    fn on_message(&mut self, data: V);

    fn add_listener(&mut self, listener: ListenerRef<V>);

    /// Read-only view of the most recent value cached for `key`.
    fn get_data(&self, key: &K) -> Result<&V, ServiceError>;
}

/// Outbound boundary adapter: receives entities and pushes bytes out.
pub trait Connector<V> {
    fn publish(&mut self, data: &V) -> anyhow::Result<()>;
}

/// Ordered set of listeners held by a service.
pub struct ListenerSet<V> {
    listeners: Vec<ListenerRef<V>>,
}

impl<V> ListenerSet<V> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn attach(&mut self, listener: ListenerRef<V>) {
        self.listeners.push(listener);
    }

    /// Invokes `on_add` on every listener in registration order.
    pub fn notify(&self, data: &V) {
        for listener in &self.listeners {
            listener.borrow_mut().on_add(data);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<V> Default for ListenerSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateless bridge from one service's notifications into a method on a downstream
/// service. Edges that carry their own state (counters and the like) get bespoke
/// [Listener] implementations instead.
pub struct ServiceBridge<S, V> {
    downstream: Rc<RefCell<S>>,
    forward: fn(&mut S, &V),
}

impl<S: 'static, V: 'static> ServiceBridge<S, V> {
    pub fn new(downstream: Rc<RefCell<S>>, forward: fn(&mut S, &V)) -> ListenerRef<V> {
        Rc::new(RefCell::new(Self {
            downstream,
            forward,
        }))
    }
}

impl<S, V> Listener<V> for ServiceBridge<S, V> {
    fn on_add(&mut self, data: &V) {
        (self.forward)(&mut self.downstream.borrow_mut(), data);
    }
}
