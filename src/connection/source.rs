//! Store-side and node-side binding endpoints.

use crate::dom::target::{CHECKED, TEXT, VALUE};
use crate::dom::{NodeId, RenderTarget, TargetRef};
use crate::store::{Bus, Change, Committer, StoreRef};
use crate::template::Template;
use crate::value::{display, is_truthy, Value};

use super::Subscription;

/// Attributes that hold a boolean and coerce written values by truthiness.
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    CHECKED, "selected", "disabled", "hidden", "readonly", "required", "multiple", "open",
];

pub fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES.contains(&name)
}

/// Default bound attribute for a node: `checked` for checkbox and radio
/// inputs, `value` for other form fields, text content otherwise.
pub fn infer_attribute(target: &dyn RenderTarget, node: NodeId) -> String {
    let kind = target.kind(node).unwrap_or_default().to_ascii_lowercase();
    let attribute = match kind.as_str() {
        "input" => {
            let checkable = target
                .get_attribute(node, "type")
                .as_ref()
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case("checkbox") || t.eq_ignore_ascii_case("radio"));
            if checkable {
                CHECKED
            } else {
                VALUE
            }
        }
        "textarea" | "select" => VALUE,
        _ => TEXT,
    };
    attribute.to_owned()
}

// ---------------------------------------------------------------------------
// Store side
// ---------------------------------------------------------------------------

/// A store attribute, plus the identity this endpoint writes under.
#[derive(Clone)]
pub struct DataEndpoint {
    store: StoreRef,
    path: String,
    committer: Committer,
}

impl DataEndpoint {
    pub fn new(store: StoreRef, path: impl Into<String>) -> Self {
        let committer = Committer::new(store.bus());
        Self {
            store,
            path: path.into(),
            committer,
        }
    }

    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn committer(&self) -> Committer {
        self.committer
    }

    /// Shared-bus topic for this attribute.
    pub fn topic(&self) -> String {
        self.store.topic(&self.path)
    }

    pub fn read(&self) -> Option<Value> {
        self.store.get(Some(&self.path))
    }

    pub fn write(&self, value: Value, committer: Option<Committer>) {
        self.store.set(&self.path, value, committer);
    }
}

/// A store endpoint with at most one live subscription.
pub struct DataSource {
    endpoint: DataEndpoint,
    subscription: Option<Subscription>,
}

impl DataSource {
    pub fn new(endpoint: DataEndpoint) -> Self {
        Self {
            endpoint,
            subscription: None,
        }
    }

    pub fn endpoint(&self) -> &DataEndpoint {
        &self.endpoint
    }

    /// Subscribe to the attribute's topic, replacing any earlier subscription.
    pub fn subscribe(&mut self, callback: impl Fn(&Change) + 'static) {
        let bus = self.endpoint.store.bus().clone();
        self.subscription = Some(Subscription::open(&bus, self.endpoint.topic(), callback));
    }

    pub fn unsubscribe(&mut self) -> bool {
        self.subscription.as_mut().is_some_and(Subscription::cancel)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }
}

// ---------------------------------------------------------------------------
// Node side
// ---------------------------------------------------------------------------

/// A node attribute, with an optional filter applied on store→node writes.
#[derive(Clone)]
pub struct NodeEndpoint {
    target: TargetRef,
    node: NodeId,
    attribute: String,
    filter: Option<Template>,
    committer: Committer,
}

impl NodeEndpoint {
    /// `attribute: None` infers the attribute from the node kind.
    pub fn new(target: TargetRef, node: NodeId, attribute: Option<&str>, bus: &Bus) -> Self {
        let attribute = match attribute {
            Some(name) => name.to_owned(),
            None => infer_attribute(target.as_ref(), node),
        };
        Self {
            target,
            node,
            attribute,
            filter: None,
            committer: Committer::new(bus),
        }
    }

    pub fn with_filter(mut self, filter: Option<Template>) -> Self {
        self.filter = filter;
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn committer(&self) -> Committer {
        self.committer
    }

    /// Current node value. Boolean attributes always read as a bool.
    pub fn read(&self) -> Option<Value> {
        let value = self.target.get_attribute(self.node, &self.attribute);
        if is_boolean_attribute(&self.attribute) {
            return Some(Value::Bool(value.as_ref().is_some_and(is_truthy)));
        }
        value
    }

    /// Push a store value into the node. Returns `false` if the node is gone.
    pub fn write(&self, value: Option<&Value>) -> bool {
        let rendered = if is_boolean_attribute(&self.attribute) {
            Value::Bool(value.is_some_and(is_truthy))
        } else {
            match &self.filter {
                Some(filter) => Value::String(filter.render_value(value)),
                None => Value::String(display(value)),
            }
        };
        self.target.set_attribute(self.node, &self.attribute, rendered)
    }
}

/// Publishes a node's current value on its per-node topic.
#[derive(Clone)]
pub struct NodeSignal {
    endpoint: NodeEndpoint,
    bus: Bus,
    topic: String,
}

impl NodeSignal {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Announce the node's value as written by the node endpoint. Returns the
    /// number of subscribers reached.
    pub fn publish(&self) -> usize {
        if !self.endpoint.target.contains(self.endpoint.node) {
            return 0;
        }
        let change = Change::new(self.endpoint.attribute.clone(), self.endpoint.read())
            .with_committer(Some(self.endpoint.committer));
        self.bus.publish(&self.topic, &change)
    }
}

/// A node endpoint subscribed under a per-node topic.
pub struct NodeSource {
    signal: NodeSignal,
    subscription: Option<Subscription>,
}

impl NodeSource {
    pub fn new(endpoint: NodeEndpoint, bus: &Bus, topic: impl Into<String>) -> Self {
        Self {
            signal: NodeSignal {
                endpoint,
                bus: bus.clone(),
                topic: topic.into(),
            },
            subscription: None,
        }
    }

    pub fn endpoint(&self) -> &NodeEndpoint {
        &self.signal.endpoint
    }

    pub fn topic(&self) -> &str {
        &self.signal.topic
    }

    pub fn signal(&self) -> NodeSignal {
        self.signal.clone()
    }

    pub fn subscribe(&mut self, callback: impl Fn(&Change) + 'static) {
        self.subscription = Some(Subscription::open(
            &self.signal.bus,
            self.signal.topic.clone(),
            callback,
        ));
    }

    pub fn unsubscribe(&mut self) -> bool {
        self.subscription.as_mut().is_some_and(Subscription::cancel)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    pub fn publish(&self) -> usize {
        self.signal.publish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryTarget;
    use crate::store::{DataStore, ReactiveStore};
    use serde_json::json;
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    fn node(target: &Rc<MemoryTarget>, kind: &str, attrs: &[(&str, Value)]) -> NodeId {
        let map: BTreeMap<String, Value> = attrs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        target.create_node(kind, &map)
    }

    #[test]
    fn attribute_inference() {
        let target = MemoryTarget::new();
        let text = node(&target, "input", &[]);
        let check = node(&target, "input", &[("type", json!("Checkbox"))]);
        let radio = node(&target, "input", &[("type", json!("radio"))]);
        let area = node(&target, "textarea", &[]);
        let span = node(&target, "span", &[]);
        assert_eq!(infer_attribute(target.as_ref(), text), "value");
        assert_eq!(infer_attribute(target.as_ref(), check), "checked");
        assert_eq!(infer_attribute(target.as_ref(), radio), "checked");
        assert_eq!(infer_attribute(target.as_ref(), area), "value");
        assert_eq!(infer_attribute(target.as_ref(), span), "text");
    }

    #[test]
    fn node_writes_stringify_and_filter() {
        let bus = Bus::new();
        let target = MemoryTarget::new();
        let n = node(&target, "p", &[]);
        let plain = NodeEndpoint::new(target.clone(), n, None, &bus);
        plain.write(Some(&json!(42)));
        assert_eq!(target.text(n), "42");
        plain.write(None);
        assert_eq!(target.get_attribute(n, "text"), Some(json!("")));

        let filtered = plain.clone().with_filter(Some(Template::parse("Total: [[value]]")));
        filtered.write(Some(&json!(7)));
        assert_eq!(target.text(n), "Total: 7");
    }

    #[test]
    fn boolean_attributes_coerce() {
        let bus = Bus::new();
        let target = MemoryTarget::new();
        let n = node(&target, "input", &[("type", json!("checkbox"))]);
        let endpoint = NodeEndpoint::new(target.clone(), n, None, &bus);
        assert_eq!(endpoint.read(), Some(json!(false)));
        endpoint.write(Some(&json!("yes")));
        assert_eq!(target.get_attribute(n, "checked"), Some(json!(true)));
        endpoint.write(Some(&json!(0)));
        assert_eq!(endpoint.read(), Some(json!(false)));
    }

    #[test]
    fn data_endpoint_reads_and_writes() {
        let bus = Bus::new();
        let store: StoreRef = DataStore::new(&bus);
        let endpoint = DataEndpoint::new(store.clone(), "user.name");
        assert_eq!(endpoint.read(), None);
        endpoint.write(json!("ada"), None);
        assert_eq!(store.get(Some("user.name")), Some(json!("ada")));
        assert_eq!(endpoint.topic(), store.topic("user.name"));
        assert_ne!(endpoint.committer(), store.committer());
    }

    #[test]
    fn data_source_subscription_lifecycle() {
        let bus = Bus::new();
        let store: StoreRef = DataStore::new(&bus);
        let mut source = DataSource::new(DataEndpoint::new(store.clone(), "a"));
        let hits = Rc::new(Cell::new(0));
        let hits_c = hits.clone();
        source.subscribe(move |_| hits_c.set(hits_c.get() + 1));
        assert!(source.is_subscribed());
        store.set("a", json!(1), None);
        assert!(source.unsubscribe());
        assert!(!source.unsubscribe());
        store.set("a", json!(2), None);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn node_source_publishes_with_its_committer() {
        let bus = Bus::new();
        let target = MemoryTarget::new();
        let n = node(&target, "input", &[("value", json!("typed"))]);
        let mut source = NodeSource::new(NodeEndpoint::new(target.clone(), n, None, &bus), &bus, "node:1");
        let who = source.endpoint().committer();
        let seen = Rc::new(Cell::new(false));
        let seen_c = seen.clone();
        source.subscribe(move |c| seen_c.set(c.is_from(who) && c.value == Some(json!("typed"))));
        assert_eq!(source.publish(), 1);
        assert!(seen.get());

        target.remove_node(n);
        assert_eq!(source.publish(), 0);
    }
}
