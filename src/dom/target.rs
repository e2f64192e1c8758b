//! The render-target capability and its in-memory implementation.
//!
//! The binder and the layout builder never touch nodes directly; they call
//! into a [`RenderTarget`]. [`MemoryTarget`] implements it over a [`Dom`]
//! arena, which is what headless hosts and tests use.

use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use super::node::{NodeData, NodeId};
use super::tree::Dom;
use crate::event::Interaction;
use crate::value::Value;

/// Text content.
pub const TEXT: &str = "text";
/// Editable value of form-like nodes.
pub const VALUE: &str = "value";
/// Checked state of checkbox and radio inputs.
pub const CHECKED: &str = "checked";
/// Raw markup content.
pub const MARKUP: &str = "html";
/// Space-separated class list accepted by `create_node`.
pub const CLASS: &str = "class";

/// Called with each node about to be removed, before it is detached.
pub type RemovalHook = Rc<dyn Fn(NodeId)>;

/// Receives every interaction the target dispatches.
pub type InteractionListener = Rc<dyn Fn(&Interaction)>;

/// Shared handle to a render target.
pub type TargetRef = Rc<dyn RenderTarget>;

/// Handle returned by [`RenderTarget::add_interaction_listener`] and
/// [`RenderTarget::on_remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Node creation, mutation and destruction primitives.
///
/// Methods on a missing node are no-ops that report failure through their
/// return value.
pub trait RenderTarget {
    /// Create a detached node. A `class` attribute becomes the class list.
    fn create_node(&self, kind: &str, attributes: &BTreeMap<String, Value>) -> NodeId;

    fn contains(&self, node: NodeId) -> bool;

    fn kind(&self, node: NodeId) -> Option<String>;

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<Value>;

    fn set_attribute(&self, node: NodeId, name: &str, value: Value) -> bool;

    fn remove_attribute(&self, node: NodeId, name: &str) -> Option<Value>;

    fn add_class(&self, node: NodeId, class: &str) -> bool;

    fn remove_class(&self, node: NodeId, class: &str) -> bool;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Append `child` (moving it if attached elsewhere).
    fn append_child(&self, parent: NodeId, child: NodeId) -> bool;

    /// Unlink a node from its parent without destroying it.
    fn detach(&self, node: NodeId);

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Destroy a node and its subtree.
    ///
    /// Every removal hook runs for every node of the subtree before anything
    /// is detached, so hooks can still read attributes.
    fn remove_node(&self, node: NodeId) -> bool;

    fn on_remove(&self, hook: RemovalHook) -> ListenerId;

    fn remove_removal_hook(&self, id: ListenerId) -> bool;

    fn add_interaction_listener(&self, listener: InteractionListener) -> ListenerId;

    fn remove_interaction_listener(&self, id: ListenerId) -> bool;
}

// ---------------------------------------------------------------------------
// MemoryTarget
// ---------------------------------------------------------------------------

/// A [`RenderTarget`] over an in-memory [`Dom`].
#[derive(Default)]
pub struct MemoryTarget {
    dom: RefCell<Dom>,
    removal_hooks: RefCell<Vec<(ListenerId, RemovalHook)>>,
    listeners: RefCell<Vec<(ListenerId, InteractionListener)>>,
    next_listener: Cell<u64>,
}

impl MemoryTarget {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Read access to the arena. Do not hold across calls that mutate the
    /// target.
    pub fn dom(&self) -> Ref<'_, Dom> {
        self.dom.borrow()
    }

    /// A snapshot of one node's data.
    pub fn node(&self, node: NodeId) -> Option<NodeData> {
        self.dom.borrow().get(node).cloned()
    }

    /// Text content of a node, `""` when unset.
    pub fn text(&self, node: NodeId) -> String {
        crate::value::display(self.get_attribute(node, TEXT).as_ref())
    }

    pub fn find(&self, name: &str, value: &Value) -> Option<NodeId> {
        self.dom.borrow().query_by_attr(name, value)
    }

    pub fn len(&self) -> usize {
        self.dom.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dom.borrow().is_empty()
    }

    /// Deliver an interaction to every listener, in registration order.
    /// Interactions on missing nodes are dropped.
    pub fn dispatch(&self, interaction: Interaction) -> usize {
        if !self.contains(interaction.node) {
            return 0;
        }
        let listeners: Vec<InteractionListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in &listeners {
            listener(&interaction);
        }
        listeners.len()
    }

    /// Set a node attribute the way a user edit would, then dispatch `Input`.
    pub fn input(&self, node: NodeId, name: &str, value: Value) -> bool {
        if !self.set_attribute(node, name, value) {
            return false;
        }
        self.dispatch(Interaction::input(node));
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn removal_hook_count(&self) -> usize {
        self.removal_hooks.borrow().len()
    }

    fn next_id(&self) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        id
    }
}

impl RenderTarget for MemoryTarget {
    fn create_node(&self, kind: &str, attributes: &BTreeMap<String, Value>) -> NodeId {
        let mut data = NodeData::new(kind);
        for (name, value) in attributes {
            match (name.as_str(), value) {
                (CLASS, Value::String(list)) => {
                    for class in list.split_whitespace() {
                        data.add_class(class);
                    }
                }
                _ => {
                    data.set_attribute(name, value.clone());
                }
            }
        }
        self.dom.borrow_mut().insert(data)
    }

    fn contains(&self, node: NodeId) -> bool {
        self.dom.borrow().contains(node)
    }

    fn kind(&self, node: NodeId) -> Option<String> {
        self.dom.borrow().get(node).map(|d| d.kind.clone())
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<Value> {
        self.dom
            .borrow()
            .get(node)
            .and_then(|d| d.attribute(name))
            .cloned()
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: Value) -> bool {
        match self.dom.borrow_mut().get_mut(node) {
            Some(data) => {
                data.set_attribute(name, value);
                true
            }
            None => false,
        }
    }

    fn remove_attribute(&self, node: NodeId, name: &str) -> Option<Value> {
        self.dom
            .borrow_mut()
            .get_mut(node)
            .and_then(|d| d.remove_attribute(name))
    }

    fn add_class(&self, node: NodeId, class: &str) -> bool {
        match self.dom.borrow_mut().get_mut(node) {
            Some(data) => {
                data.add_class(class);
                true
            }
            None => false,
        }
    }

    fn remove_class(&self, node: NodeId, class: &str) -> bool {
        match self.dom.borrow_mut().get_mut(node) {
            Some(data) => {
                data.remove_class(class);
                true
            }
            None => false,
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.dom
            .borrow()
            .get(node)
            .is_some_and(|d| d.has_class(class))
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> bool {
        self.dom.borrow_mut().append(parent, child)
    }

    fn detach(&self, node: NodeId) {
        self.dom.borrow_mut().detach(node);
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.dom.borrow().children(node).to_vec()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.borrow().parent(node)
    }

    fn remove_node(&self, node: NodeId) -> bool {
        let subtree = self.dom.borrow().walk_depth_first(node);
        if subtree.is_empty() {
            return false;
        }
        let hooks: Vec<RemovalHook> = self
            .removal_hooks
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for &id in &subtree {
            for hook in &hooks {
                hook(id);
            }
        }
        tracing::debug!(nodes = subtree.len(), "remove node");
        self.dom.borrow_mut().remove(node).is_some()
    }

    fn on_remove(&self, hook: RemovalHook) -> ListenerId {
        let id = self.next_id();
        self.removal_hooks.borrow_mut().push((id, hook));
        id
    }

    fn remove_removal_hook(&self, id: ListenerId) -> bool {
        let mut hooks = self.removal_hooks.borrow_mut();
        let before = hooks.len();
        hooks.retain(|(h, _)| *h != id);
        hooks.len() != before
    }

    fn add_interaction_listener(&self, listener: InteractionListener) -> ListenerId {
        let id = self.next_id();
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_interaction_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }
}
