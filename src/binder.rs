//! Binder: one-way watches and two-way binds between stores and nodes.
//!
//! The binder owns the [`ConnectionTracker`] and two hooks on the render
//! target, both installed once at construction:
//!
//! - an interaction listener that re-announces a bound node's value after a
//!   node-originated edit, so the bound store sees it;
//! - a removal hook that releases every connection of each removed node.
//!
//! Bound nodes get a binder-local [`BindId`], drawn lazily from the bus id
//! space and stored as a node attribute (`data-bind-id` by default).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::connection::{
    BindId, ConnectionTracker, DataEndpoint, NodeEndpoint, NodeSource, OneWayConnection,
    TwoWayConnection,
};
use crate::dom::{ListenerId, NodeId, TargetRef};
use crate::event::{Interaction, Key, DEFAULT_IGNORED_KEYS};
use crate::store::{Bus, Change, StoreRef};
use crate::template::Template;
use crate::value::{has_data, Value};

/// Tracker key of a node's two-way binding.
pub const BIND_KIND: &str = "bind";

// ---------------------------------------------------------------------------
// BinderConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BinderConfig {
    /// Node attribute that stores the bind id.
    pub id_attribute: String,
    /// Key presses that never trigger a re-announce.
    pub ignored_keys: Vec<Key>,
    /// Prefix of per-node bus topics (`"{prefix}:{bind_id}"`).
    pub node_topic_prefix: String,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            id_attribute: "data-bind-id".to_owned(),
            ignored_keys: DEFAULT_IGNORED_KEYS.to_vec(),
            node_topic_prefix: "node".to_owned(),
        }
    }
}

impl BinderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = name.into();
        self
    }

    pub fn with_ignored_keys(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.ignored_keys = keys.into_iter().collect();
        self
    }

    pub fn with_node_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.node_topic_prefix = prefix.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Binder
// ---------------------------------------------------------------------------

struct Inner {
    bus: Bus,
    target: TargetRef,
    tracker: RefCell<ConnectionTracker>,
    config: BinderConfig,
    listener: Cell<Option<ListenerId>>,
    removal_hook: Cell<Option<ListenerId>>,
}

impl Inner {
    fn detach_hooks(&self) {
        if let Some(listener) = self.listener.take() {
            self.target.remove_interaction_listener(listener);
        }
        if let Some(hook) = self.removal_hook.take() {
            self.target.remove_removal_hook(hook);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.detach_hooks();
    }
}

/// Cheap-to-clone handle; clones share one tracker.
#[derive(Clone)]
pub struct Binder {
    inner: Rc<Inner>,
}

impl Binder {
    pub fn new(bus: &Bus, target: TargetRef) -> Self {
        Self::with_config(bus, target, BinderConfig::default())
    }

    pub fn with_config(bus: &Bus, target: TargetRef, config: BinderConfig) -> Self {
        let inner = Rc::new(Inner {
            bus: bus.clone(),
            target,
            tracker: RefCell::new(ConnectionTracker::new()),
            config,
            listener: Cell::new(None),
            removal_hook: Cell::new(None),
        });

        let weak: Weak<Inner> = Rc::downgrade(&inner);
        let listener = inner
            .target
            .add_interaction_listener(Rc::new(move |interaction: &Interaction| {
                if let Some(inner) = weak.upgrade() {
                    Binder { inner }.on_interaction(interaction);
                }
            }));
        inner.listener.set(Some(listener));

        let weak: Weak<Inner> = Rc::downgrade(&inner);
        let hook = inner.target.on_remove(Rc::new(move |node| {
            if let Some(inner) = weak.upgrade() {
                Binder { inner }.release(node);
            }
        }));
        inner.removal_hook.set(Some(hook));

        Self { inner }
    }

    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    pub fn target(&self) -> &TargetRef {
        &self.inner.target
    }

    pub fn config(&self) -> &BinderConfig {
        &self.inner.config
    }

    /// The node's bind id, assigning one on first use. `None` if the node
    /// does not exist.
    pub fn bind_id(&self, node: NodeId) -> Option<BindId> {
        if let Some(id) = self.existing_bind_id(node) {
            return Some(id);
        }
        if !self.inner.target.contains(node) {
            return None;
        }
        let id = BindId::new(self.inner.bus.allocate_id());
        self.inner.target.set_attribute(
            node,
            &self.inner.config.id_attribute,
            Value::String(id.to_string()),
        );
        Some(id)
    }

    fn existing_bind_id(&self, node: NodeId) -> Option<BindId> {
        self.inner
            .target
            .get_attribute(node, &self.inner.config.id_attribute)?
            .as_str()?
            .parse()
            .ok()
    }

    /// Two-way bind `node` to `path` in `store`, then run first-bind
    /// synchronization. An existing bind on the node is replaced.
    ///
    /// Returns `false` (and changes nothing) for an empty path or a missing
    /// node.
    pub fn bind(&self, node: NodeId, store: &StoreRef, path: &str, filter: Option<Template>) -> bool {
        if path.is_empty() {
            return false;
        }
        let Some(id) = self.bind_id(node) else {
            return false;
        };

        let bus = &self.inner.bus;
        let element = NodeEndpoint::new(self.inner.target.clone(), node, None, bus).with_filter(filter);
        let topic = format!("{}:{}", self.inner.config.node_topic_prefix, id);
        let mut connection = TwoWayConnection::new();
        connection
            .add_data(DataEndpoint::new(store.clone(), path))
            .add_element(NodeSource::new(element, bus, topic));

        let synced = connection.bind().and_then(|()| connection.synchronize());
        if let Err(err) = synced {
            tracing::warn!(%err, bind_id = %id, "bind failed");
            return false;
        }

        tracing::debug!(bind_id = %id, store = %store.id(), path, "bind");
        self.inner
            .tracker
            .borrow_mut()
            .add(id, BIND_KIND, connection.into());
        true
    }

    /// One-way watch keyed `watch:{store}:{path}`. If the store already holds
    /// data at `path`, `callback` runs once immediately.
    pub fn watch(
        &self,
        node: NodeId,
        store: &StoreRef,
        path: &str,
        callback: impl Fn(&Change) + 'static,
    ) -> bool {
        let kind = watch_kind(store, path);
        self.watch_as(node, &kind, store, path, callback)
    }

    /// [`watch`](Self::watch) under an explicit tracker key.
    pub fn watch_as(
        &self,
        node: NodeId,
        kind: &str,
        store: &StoreRef,
        path: &str,
        callback: impl Fn(&Change) + 'static,
    ) -> bool {
        if path.is_empty() {
            return false;
        }
        let Some(id) = self.bind_id(node) else {
            return false;
        };

        let callback: Rc<dyn Fn(&Change)> = Rc::new(callback);
        let endpoint = DataEndpoint::new(store.clone(), path);
        let mut connection = OneWayConnection::new(endpoint.clone());
        let subscribed = Rc::clone(&callback);
        if let Err(err) = connection.watch(move |change| subscribed(change)) {
            tracing::warn!(%err, bind_id = %id, "watch failed");
            return false;
        }

        tracing::debug!(bind_id = %id, store = %store.id(), path, kind, "watch");
        self.inner
            .tracker
            .borrow_mut()
            .add(id, kind, connection.into());

        let current = endpoint.read();
        if has_data(current.as_ref(), false) {
            callback(&Change::new(store.canonical(path), current));
        }
        true
    }

    /// Remove every connection registered for `node`. Returns how many were
    /// removed.
    pub fn unbind(&self, node: NodeId) -> usize {
        match self.existing_bind_id(node) {
            Some(id) => {
                let removed = self.inner.tracker.borrow_mut().remove(id, None);
                if removed > 0 {
                    tracing::debug!(bind_id = %id, removed, "unbind");
                }
                removed
            }
            None => 0,
        }
    }

    /// Remove the watch [`watch`](Self::watch) registered for this store path.
    pub fn unwatch(&self, node: NodeId, store: &StoreRef, path: &str) -> bool {
        self.unwatch_as(node, &watch_kind(store, path))
    }

    pub fn unwatch_as(&self, node: NodeId, kind: &str) -> bool {
        let Some(id) = self.existing_bind_id(node) else {
            return false;
        };
        let removed = self.inner.tracker.borrow_mut().remove(id, Some(kind)) > 0;
        if removed {
            tracing::debug!(bind_id = %id, kind, "unwatch");
        }
        removed
    }

    /// Re-announce a bound node's value toward its store, as after a user
    /// edit. Returns the number of subscribers reached.
    pub fn notify(&self, node: NodeId) -> usize {
        let Some(id) = self.existing_bind_id(node) else {
            return 0;
        };
        // Released before publishing: subscribers may bind or unbind.
        let signal = {
            let tracker = self.inner.tracker.borrow();
            tracker
                .get(id, BIND_KIND)
                .and_then(|c| c.as_two_way())
                .and_then(TwoWayConnection::signal)
        };
        signal.map_or(0, |s| s.publish())
    }

    /// Destroy a node through the render target; its connections (and those
    /// of its descendants) are released by the removal hook.
    pub fn remove_node(&self, node: NodeId) -> bool {
        self.inner.target.remove_node(node)
    }

    pub fn connection_count(&self, node: NodeId) -> usize {
        self.existing_bind_id(node)
            .map_or(0, |id| self.inner.tracker.borrow().count(id))
    }

    /// Binding kinds registered for `node`, sorted.
    pub fn kinds(&self, node: NodeId) -> Vec<String> {
        self.existing_bind_id(node)
            .map(|id| self.inner.tracker.borrow().kinds(id))
            .unwrap_or_default()
    }

    /// Total live connections across all nodes.
    pub fn len(&self) -> usize {
        self.inner.tracker.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tracker.borrow().is_empty()
    }

    /// Detach both target hooks and drop every connection. Dropping the last
    /// handle detaches the hooks too.
    pub fn dispose(&self) -> usize {
        self.inner.detach_hooks();
        let dropped = self.inner.tracker.borrow_mut().clear();
        tracing::debug!(dropped, "binder disposed");
        dropped
    }

    fn on_interaction(&self, interaction: &Interaction) {
        if !interaction.may_edit(&self.inner.config.ignored_keys) {
            tracing::trace!(kind = ?interaction.kind, "interaction ignored");
            return;
        }
        self.notify(interaction.node);
    }

    fn release(&self, node: NodeId) {
        self.unbind(node);
    }
}

fn watch_kind(store: &StoreRef, path: &str) -> String {
    format!("watch:{}:{}", store.id(), store.canonical(path))
}
