//! Reactive key/value stores.
//!
//! Three variants share the [`ReactiveStore`] contract:
//!
//! - [`Store`] (shallow): plain keys, idempotent scalar writes, plus a
//!   wildcard `change` topic for "any attribute changed".
//! - [`DataStore`] (deep): dotted/bracketed paths into nested values, a
//!   staged/committed buffer pair with `revert`, and multi-level publishing.
//! - [`SimpleStore`]: literal keys only (`"a.b"` is one key); the backing
//!   store for state targets.
//!
//! Every write carries an optional [`Committer`]: the identity of the endpoint
//! that caused it. Bindings compare committers to stop a two-way edit from
//! echoing back to where it came from.
//!
//! Each store publishes twice per change: on its own local bus under
//! `"{path}:change"` (for [`ReactiveStore::on`]) and on the shared [`Bus`]
//! under `"{store_id}:{path}"` (for bindings and cross-store links).

pub mod deep;
pub mod shallow;
pub mod simple;

use std::fmt;
use std::rc::Rc;

use crate::pubsub::{PubSub, Token};
use crate::value::{is_truthy, Map, Value};

pub use deep::DataStore;
pub use shallow::Store;
pub use simple::SimpleStore;

/// Opaque identity of a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Committer(u64);

impl Committer {
    /// Draw a fresh identity from the bus id space.
    pub fn new(bus: &Bus) -> Self {
        Self(bus.allocate_id())
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Per-store id; namespaces the store's topics on the shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(u64);

impl StoreId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One attribute change, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Canonical path (or node attribute) that changed.
    pub path: String,
    /// New value; `None` when the attribute was deleted.
    pub value: Option<Value>,
    /// Value before the write, when known.
    pub previous: Option<Value>,
    /// Who caused the write. `None` means an external, authoritative write.
    pub committer: Option<Committer>,
}

impl Change {
    pub fn new(path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            path: path.into(),
            value,
            previous: None,
            committer: None,
        }
    }

    pub fn with_previous(mut self, previous: Option<Value>) -> Self {
        self.previous = previous;
        self
    }

    pub fn with_committer(mut self, committer: Option<Committer>) -> Self {
        self.committer = committer;
        self
    }

    /// Whether this change was written by `committer`.
    pub fn is_from(&self, committer: Committer) -> bool {
        self.committer == Some(committer)
    }
}

/// The bus stores and bindings share.
pub type Bus = PubSub<Change>;

/// Shared handle to any store variant.
pub type StoreRef = Rc<dyn ReactiveStore>;

/// Subscriber callback for [`ReactiveStore::on`].
pub type ChangeFn = Box<dyn Fn(&Change)>;

/// Contract shared by all store variants.
///
/// Every method takes `&self`: stores keep their buffers behind `RefCell`s
/// and never hold a borrow while publishing, so subscribers may read and
/// write the store they are notified by.
pub trait ReactiveStore {
    fn id(&self) -> StoreId;

    /// Identity this store writes under when it forwards values elsewhere.
    fn committer(&self) -> Committer;

    /// Shared bus the store publishes `"{id}:{path}"` topics on.
    fn bus(&self) -> &Bus;

    /// Value at `path`, or the whole store when `path` is `None`.
    fn get(&self, path: Option<&str>) -> Option<Value>;

    /// Write one attribute and notify subscribers.
    fn set(&self, path: &str, value: Value, committer: Option<Committer>);

    /// Write several attributes, one notification round per key.
    fn set_many(&self, values: Map<String, Value>, committer: Option<Committer>) {
        for (path, value) in values {
            self.set(&path, value, committer);
        }
    }

    /// Delete one attribute, or everything when `path` is `None`.
    /// Deleting a missing attribute is a no-op.
    fn delete(&self, path: Option<&str>);

    /// Subscribe to changes of one attribute.
    fn on(&self, path: &str, callback: ChangeFn) -> Token;

    /// Remove an [`on`](Self::on) subscription.
    fn off(&self, path: &str, token: Token);

    /// Canonical spelling of `path` used in topic names.
    fn canonical(&self, path: &str) -> String {
        path.to_owned()
    }

    /// Shared-bus topic for `path`.
    fn topic(&self, path: &str) -> String {
        format!("{}:{}", self.id(), self.canonical(path))
    }

    /// Flip the truthiness of an attribute. Empty path is a no-op.
    fn toggle(&self, path: &str, committer: Option<Committer>) {
        if path.is_empty() {
            return;
        }
        let current = self.get(Some(path)).is_some_and(|v| is_truthy(&v));
        self.set(path, Value::Bool(!current), committer);
    }

    /// Add `by` to a numeric attribute; missing or non-numeric values count
    /// as zero. Empty path is a no-op.
    fn increment(&self, path: &str, by: i64, committer: Option<Committer>) {
        if path.is_empty() {
            return;
        }
        let next = match self.get(Some(path)) {
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => Value::from(i.saturating_add(by)),
                None => Value::from(n.as_f64().unwrap_or_default() + by as f64),
            },
            _ => Value::from(by),
        };
        self.set(path, next, committer);
    }

    /// Subtract `by` from a numeric attribute. Empty path is a no-op.
    fn decrement(&self, path: &str, by: i64, committer: Option<Committer>) {
        self.increment(path, by.saturating_neg(), committer);
    }
}

/// Local topic for [`ReactiveStore::on`] subscriptions.
pub(crate) fn change_topic(path: &str) -> String {
    format!("{path}:change")
}

/// Identity and buses every variant carries.
pub(crate) struct Channels {
    pub id: StoreId,
    pub committer: Committer,
    pub bus: Bus,
    pub local: PubSub<Change>,
}

impl Channels {
    pub fn new(bus: &Bus) -> Self {
        Self {
            id: StoreId(bus.allocate_id()),
            committer: Committer::new(bus),
            bus: bus.clone(),
            local: PubSub::new(),
        }
    }

    /// Publish on the local `path:change` topic, then on the shared bus.
    pub fn announce(&self, change: &Change) {
        self.local.publish(&change_topic(&change.path), change);
        self.bus
            .publish(&format!("{}:{}", self.id, change.path), change);
    }

    pub fn on(&self, path: &str, callback: ChangeFn) -> Token {
        self.local.subscribe(change_topic(path), callback)
    }

    pub fn off(&self, path: &str, token: Token) {
        self.local.unsubscribe(&change_topic(path), token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn sugar_on_shallow_store() {
        let bus = Bus::new();
        let store = Store::new(&bus);
        store.toggle("open", None);
        assert_eq!(store.get(Some("open")), Some(json!(true)));
        store.toggle("open", None);
        assert_eq!(store.get(Some("open")), Some(json!(false)));

        store.increment("count", 2, None);
        store.increment("count", 3, None);
        store.decrement("count", 1, None);
        assert_eq!(store.get(Some("count")), Some(json!(4)));

        store.set("ratio", json!(0.5), None);
        store.increment("ratio", 1, None);
        assert_eq!(store.get(Some("ratio")), Some(json!(1.5)));
    }

    #[test]
    fn sugar_with_empty_path_is_noop() {
        let bus = Bus::new();
        let store = DataStore::new(&bus);
        let hits = Rc::new(RefCell::new(0));
        let hits_c = hits.clone();
        bus.subscribe(store.topic(""), move |_| *hits_c.borrow_mut() += 1);
        store.toggle("", None);
        store.increment("", 1, None);
        store.decrement("", 1, None);
        assert_eq!(*hits.borrow(), 0);
        assert_eq!(store.get(None), Some(json!({})));
    }

    #[test]
    fn ids_and_committers_do_not_collide() {
        let bus = Bus::new();
        let a = Store::new(&bus);
        let b = SimpleStore::new(&bus);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.committer(), b.committer());
        assert_ne!(a.id().get(), a.committer().get());
    }

    #[test]
    fn change_builder() {
        let bus = Bus::new();
        let who = Committer::new(&bus);
        let change = Change::new("a", Some(json!(1)))
            .with_previous(Some(json!(0)))
            .with_committer(Some(who));
        assert!(change.is_from(who));
        assert!(!Change::new("a", None).is_from(who));
    }
}
