//! Typed layout descriptions.
//!
//! A [`Layout`] is the intermediate form of one declarative node: its tag,
//! plain attributes, ordered children and a list of [`Directive`]s. Reserved
//! keys are resolved into directives once (by [`Layout::parse`] or the fluent
//! methods below) so the builder never inspects key names.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::NodeId;
use crate::store::StoreRef;
use crate::template::Template;
use crate::value::Value;

/// Tag used for bare text children.
pub const TEXT_TAG: &str = "#text";

/// Builds replacement content from a watched value.
pub type RenderFn = Rc<dyn Fn(Option<&Value>) -> Rendered>;

/// Receives the node and the current value of every distinct placeholder.
pub type WatchFn = Rc<dyn Fn(NodeId, &[Option<Value>])>;

/// Runs once a node and its subtree are built.
pub type CreatedFn = Rc<dyn Fn(NodeId)>;

/// What a render callback produced.
#[derive(Debug, Clone)]
pub enum Rendered {
    /// Rebuild the node's children from these descriptions.
    Layouts(Vec<Layout>),
    /// Replace the children with literal text.
    Text(String),
    /// Replace the children with raw markup.
    Markup(String),
    /// Clear the children.
    Nothing,
}

impl From<Layout> for Rendered {
    fn from(layout: Layout) -> Self {
        Rendered::Layouts(vec![layout])
    }
}

impl From<Vec<Layout>> for Rendered {
    fn from(layouts: Vec<Layout>) -> Self {
        Rendered::Layouts(layouts)
    }
}

impl From<String> for Rendered {
    fn from(text: String) -> Self {
        Rendered::Text(text)
    }
}

impl From<&str> for Rendered {
    fn from(text: &str) -> Self {
        Rendered::Text(text.to_owned())
    }
}

#[derive(Clone)]
pub struct BindSpec {
    /// `None` inherits the data context.
    pub source: Option<StoreRef>,
    pub path: String,
    pub filter: Option<Template>,
}

#[derive(Clone)]
pub enum WatchTarget {
    /// Re-render the template into this node attribute.
    Attribute(String),
    Callback(WatchFn),
}

#[derive(Clone)]
pub struct WatchSpec {
    /// Empty inherits the data context. One store serves every placeholder;
    /// several are matched to placeholders by position.
    pub sources: Vec<StoreRef>,
    pub template: Template,
    pub target: WatchTarget,
}

impl WatchSpec {
    /// Watch `template` and render it into `attribute`.
    pub fn attribute(template: &str, attribute: impl Into<String>) -> Self {
        Self {
            sources: Vec::new(),
            template: Template::parse(template),
            target: WatchTarget::Attribute(attribute.into()),
        }
    }

    pub fn callback(template: &str, callback: impl Fn(NodeId, &[Option<Value>]) + 'static) -> Self {
        Self {
            sources: Vec::new(),
            template: Template::parse(template),
            target: WatchTarget::Callback(Rc::new(callback)),
        }
    }

    pub fn with_source(mut self, store: &StoreRef) -> Self {
        self.sources.push(store.clone());
        self
    }
}

#[derive(Clone)]
pub enum StateAction {
    /// `(value, class)` pairs: a class is present iff the watched value's
    /// display form equals its value.
    Classes(Vec<(String, String)>),
    Render(RenderFn),
}

#[derive(Clone)]
pub struct StateSpec {
    /// `None` inherits the state (`OnState`) or data (`OnSet`) context.
    pub source: Option<StoreRef>,
    pub path: String,
    pub action: StateAction,
}

/// One reserved-key directive.
#[derive(Clone)]
pub enum Directive {
    Bind(BindSpec),
    Watch(WatchSpec),
    OnState(StateSpec),
    OnSet(StateSpec),
    Route(Value),
    Switch(Value),
    OnCreated(CreatedFn),
    Cache(bool),
    /// Data context for this node and its descendants.
    Data(StoreRef),
    /// State context for this node and its descendants.
    State(StoreRef),
}

impl Directive {
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Bind(_) => "bind",
            Directive::Watch(_) => "watch",
            Directive::OnState(_) => "onState",
            Directive::OnSet(_) => "onSet",
            Directive::Route(_) => "route",
            Directive::Switch(_) => "switch",
            Directive::OnCreated(_) => "onCreated",
            Directive::Cache(_) => "cache",
            Directive::Data(_) => "data",
            Directive::State(_) => "state",
        }
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Bind(spec) => f.debug_tuple("Bind").field(&spec.path).finish(),
            Directive::Watch(spec) => f.debug_tuple("Watch").field(&spec.template.source()).finish(),
            Directive::OnState(spec) | Directive::OnSet(spec) => {
                f.debug_tuple(self.name()).field(&spec.path).finish()
            }
            Directive::Route(v) | Directive::Switch(v) => f.debug_tuple(self.name()).field(v).finish(),
            Directive::Cache(on) => f.debug_tuple("Cache").field(on).finish(),
            Directive::OnCreated(_) | Directive::Data(_) | Directive::State(_) => {
                f.write_str(self.name())
            }
        }
    }
}

/// A declarative node description.
#[derive(Debug, Clone)]
pub struct Layout {
    pub tag: String,
    pub attributes: BTreeMap<String, Value>,
    /// `None` entries are skipped at build time.
    pub children: Vec<Option<Layout>>,
    pub directives: Vec<Directive>,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new("div")
    }
}

impl Layout {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            directives: Vec::new(),
        }
    }

    /// A bare text node.
    pub fn text(content: impl Into<String>) -> Self {
        let content: String = content.into();
        Self::new(TEXT_TAG).attr(crate::dom::target::TEXT, content)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: Layout) -> Self {
        self.children.push(Some(child));
        self
    }

    /// Push an optional child; `None` is kept as a skipped slot.
    pub fn maybe_child(mut self, child: Option<Layout>) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Layout>) -> Self {
        self.children.extend(children.into_iter().map(Some));
        self
    }

    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    /// Two-way bind against the inherited data context.
    pub fn bind(self, path: impl Into<String>) -> Self {
        self.directive(Directive::Bind(BindSpec {
            source: None,
            path: path.into(),
            filter: None,
        }))
    }

    pub fn bind_to(self, store: &StoreRef, path: impl Into<String>) -> Self {
        self.directive(Directive::Bind(BindSpec {
            source: Some(store.clone()),
            path: path.into(),
            filter: None,
        }))
    }

    /// Bind with a store→node filter such as `"Total: [[value]]"`.
    pub fn bind_filtered(self, path: impl Into<String>, filter: &str) -> Self {
        self.directive(Directive::Bind(BindSpec {
            source: None,
            path: path.into(),
            filter: Some(Template::parse(filter)),
        }))
    }

    /// Render `template` into `attribute` whenever a placeholder changes.
    pub fn watch(self, template: &str, attribute: impl Into<String>) -> Self {
        self.directive(Directive::Watch(WatchSpec::attribute(template, attribute)))
    }

    pub fn watch_with(self, spec: WatchSpec) -> Self {
        self.directive(Directive::Watch(spec))
    }

    pub fn on_state_classes<V, C>(self, path: impl Into<String>, table: impl IntoIterator<Item = (V, C)>) -> Self
    where
        V: Into<String>,
        C: Into<String>,
    {
        self.directive(Directive::OnState(StateSpec {
            source: None,
            path: path.into(),
            action: StateAction::Classes(collect_table(table)),
        }))
    }

    pub fn on_state_render(
        self,
        path: impl Into<String>,
        render: impl Fn(Option<&Value>) -> Rendered + 'static,
    ) -> Self {
        self.directive(Directive::OnState(StateSpec {
            source: None,
            path: path.into(),
            action: StateAction::Render(Rc::new(render)),
        }))
    }

    pub fn on_set_classes<V, C>(self, path: impl Into<String>, table: impl IntoIterator<Item = (V, C)>) -> Self
    where
        V: Into<String>,
        C: Into<String>,
    {
        self.directive(Directive::OnSet(StateSpec {
            source: None,
            path: path.into(),
            action: StateAction::Classes(collect_table(table)),
        }))
    }

    pub fn on_set_render(
        self,
        path: impl Into<String>,
        render: impl Fn(Option<&Value>) -> Rendered + 'static,
    ) -> Self {
        self.directive(Directive::OnSet(StateSpec {
            source: None,
            path: path.into(),
            action: StateAction::Render(Rc::new(render)),
        }))
    }

    pub fn route(self, route: impl Into<Value>) -> Self {
        self.directive(Directive::Route(route.into()))
    }

    pub fn switch(self, switch: impl Into<Value>) -> Self {
        self.directive(Directive::Switch(switch.into()))
    }

    pub fn on_created(self, callback: impl Fn(NodeId) + 'static) -> Self {
        self.directive(Directive::OnCreated(Rc::new(callback)))
    }

    pub fn cache(self, persist: bool) -> Self {
        self.directive(Directive::Cache(persist))
    }

    pub fn data(self, store: &StoreRef) -> Self {
        self.directive(Directive::Data(store.clone()))
    }

    pub fn state(self, store: &StoreRef) -> Self {
        self.directive(Directive::State(store.clone()))
    }

    /// Names of this node's directives, in declaration order.
    pub fn directive_names(&self) -> Vec<&'static str> {
        self.directives.iter().map(Directive::name).collect()
    }

    /// Non-skipped children.
    pub fn live_children(&self) -> impl Iterator<Item = &Layout> {
        self.children.iter().flatten()
    }
}

fn collect_table<V, C>(table: impl IntoIterator<Item = (V, C)>) -> Vec<(String, String)>
where
    V: Into<String>,
    C: Into<String>,
{
    table
        .into_iter()
        .map(|(value, class)| (value.into(), class.into()))
        .collect()
}
