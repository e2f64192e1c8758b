//! Builds live node trees from [`Layout`] descriptions.
//!
//! Construction is depth-first: create the node, build its children, then
//! apply its directives (bind, watch, onState/onSet, route/switch) and
//! finally run `onCreated`. Directives that cannot resolve a data source are
//! skipped; the node still renders.
//!
//! Subtree updates are clear-and-rebuild. Clearing removes each child
//! through the render target, so every binding below it is released. When
//! the effective persist flag is on, rebuilt children are cached under a
//! state key (`path:value`) and reattached, identity-equal, the next time
//! the watched value returns to that state.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::description::{
    Directive, Layout, RenderFn, Rendered, StateAction, StateSpec, WatchSpec, WatchTarget,
};
use crate::binder::Binder;
use crate::dom::target::{MARKUP, TEXT};
use crate::dom::{ListenerId, NodeId, RenderTarget, TargetRef};
use crate::store::StoreRef;
use crate::value::{display, state_key, Value};

// ---------------------------------------------------------------------------
// BuildContext / Router
// ---------------------------------------------------------------------------

/// Inherited build state: the data and state stores directives resolve
/// against, and whether rebuilt subtrees are cached.
#[derive(Clone, Default)]
pub struct BuildContext {
    pub data: Option<StoreRef>,
    pub state: Option<StoreRef>,
    pub persist: bool,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, store: &StoreRef) -> Self {
        self.data = Some(store.clone());
        self
    }

    pub fn with_state(mut self, store: &StoreRef) -> Self {
        self.state = Some(store.clone());
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

/// Receives `route` and `switch` directives.
pub trait Router {
    fn route(&self, node: NodeId, route: &Value, context: &BuildContext);
    fn switch(&self, node: NodeId, switch: &Value, context: &BuildContext);
}

// ---------------------------------------------------------------------------
// LayoutBuilder
// ---------------------------------------------------------------------------

type Cache = HashMap<NodeId, HashMap<String, Vec<NodeId>>>;

struct Inner {
    target: TargetRef,
    binder: Binder,
    router: RefCell<Option<Rc<dyn Router>>>,
    cache: RefCell<Cache>,
    removal_hook: Cell<Option<ListenerId>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(hook) = self.removal_hook.take() {
            self.target.remove_removal_hook(hook);
        }
    }
}

/// Cheap-to-clone handle; clones share one rebuild cache.
#[derive(Clone)]
pub struct LayoutBuilder {
    inner: Rc<Inner>,
}

impl LayoutBuilder {
    pub fn new(binder: &Binder) -> Self {
        let inner = Rc::new(Inner {
            target: binder.target().clone(),
            binder: binder.clone(),
            router: RefCell::new(None),
            cache: RefCell::new(HashMap::new()),
            removal_hook: Cell::new(None),
        });
        let weak: Weak<Inner> = Rc::downgrade(&inner);
        let hook = inner.target.on_remove(Rc::new(move |node| {
            if let Some(inner) = weak.upgrade() {
                LayoutBuilder { inner }.forget(node);
            }
        }));
        inner.removal_hook.set(Some(hook));
        Self { inner }
    }

    pub fn set_router(&self, router: Rc<dyn Router>) {
        *self.inner.router.borrow_mut() = Some(router);
    }

    pub fn binder(&self) -> &Binder {
        &self.inner.binder
    }

    pub fn target(&self) -> &TargetRef {
        &self.inner.target
    }

    /// Build a detached subtree and return its root.
    pub fn build(&self, layout: &Layout, context: &BuildContext) -> NodeId {
        self.build_node(layout, context)
    }

    /// Build and append under `parent`. `None` if `parent` does not exist.
    pub fn mount(&self, parent: NodeId, layout: &Layout, context: &BuildContext) -> Option<NodeId> {
        if !self.inner.target.contains(parent) {
            return None;
        }
        let node = self.build_node(layout, context);
        self.inner.target.append_child(parent, node);
        Some(node)
    }

    /// Build each layout and append it under `parent`, in order.
    pub fn build_all(&self, parent: NodeId, layouts: &[Layout], context: &BuildContext) -> Vec<NodeId> {
        layouts
            .iter()
            .map(|layout| {
                let node = self.build_node(layout, context);
                self.inner.target.append_child(parent, node);
                node
            })
            .collect()
    }

    /// Clear `node`'s children and build `layouts` in their place.
    pub fn rebuild(&self, node: NodeId, layouts: &[Layout], context: &BuildContext) -> Vec<NodeId> {
        if !self.inner.target.contains(node) {
            return Vec::new();
        }
        let cleared = self.clear(node);
        tracing::debug!(?node, cleared, "rebuild");
        self.build_all(node, layouts, context)
    }

    /// Rebuild through the cache: reattach the children cached under `key`,
    /// or clear, build `produce()` and cache the result.
    pub fn rebuild_cached(
        &self,
        node: NodeId,
        key: &str,
        context: &BuildContext,
        produce: impl FnOnce() -> Vec<Layout>,
    ) -> Vec<NodeId> {
        if !self.inner.target.contains(node) {
            return Vec::new();
        }
        if let Some(children) = self.restore(node, key) {
            return children;
        }
        self.clear(node);
        let built = self.build_all(node, &produce(), context);
        self.inner
            .cache
            .borrow_mut()
            .entry(node)
            .or_default()
            .insert(key.to_owned(), built.clone());
        tracing::debug!(?node, key, "rebuild cached");
        built
    }

    /// Remove `node`'s children. Cached children are detached and kept;
    /// the rest are destroyed. Returns how many children were cleared.
    pub fn clear(&self, node: NodeId) -> usize {
        let target = &self.inner.target;
        let children = target.children(node);
        for &child in &children {
            if self.is_cached_under(node, child) {
                target.detach(child);
            } else {
                target.remove_node(child);
            }
        }
        children.len()
    }

    /// State keys cached for `node`, sorted.
    pub fn cached_keys(&self, node: NodeId) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .cache
            .borrow()
            .get(&node)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn is_cached_under(&self, node: NodeId, child: NodeId) -> bool {
        self.inner
            .cache
            .borrow()
            .get(&node)
            .is_some_and(|entries| entries.values().any(|kids| kids.contains(&child)))
    }

    fn restore(&self, node: NodeId, key: &str) -> Option<Vec<NodeId>> {
        let cached = self
            .inner
            .cache
            .borrow()
            .get(&node)
            .and_then(|entries| entries.get(key))
            .cloned()?;
        let target = &self.inner.target;
        if !cached.iter().all(|&child| target.contains(child)) {
            if let Some(entries) = self.inner.cache.borrow_mut().get_mut(&node) {
                entries.remove(key);
            }
            return None;
        }
        self.clear(node);
        for &child in &cached {
            target.append_child(node, child);
        }
        tracing::debug!(?node, key, "cache hit");
        Some(cached)
    }

    /// Removal hook: drop the node's cache and destroy cached subtrees that
    /// are not attached anywhere.
    fn forget(&self, node: NodeId) {
        let Some(entries) = self.inner.cache.borrow_mut().remove(&node) else {
            return;
        };
        let target = &self.inner.target;
        for child in entries.into_values().flatten() {
            if target.contains(child) && target.parent(child).is_none() {
                target.remove_node(child);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    fn build_node(&self, layout: &Layout, inherited: &BuildContext) -> NodeId {
        let target = &self.inner.target;
        let node = target.create_node(&layout.tag, &layout.attributes);

        let mut context = inherited.clone();
        for directive in &layout.directives {
            match directive {
                Directive::Cache(persist) => context.persist = *persist,
                Directive::Data(store) => context.data = Some(store.clone()),
                Directive::State(store) => context.state = Some(store.clone()),
                _ => {}
            }
        }

        for child in layout.live_children() {
            let child_node = self.build_node(child, &context);
            target.append_child(node, child_node);
        }

        for (index, directive) in layout.directives.iter().enumerate() {
            self.apply(node, index, directive, &context);
        }
        for directive in &layout.directives {
            if let Directive::OnCreated(callback) = directive {
                callback(node);
            }
        }
        node
    }

    fn apply(&self, node: NodeId, index: usize, directive: &Directive, context: &BuildContext) {
        match directive {
            Directive::Bind(spec) => {
                let Some(store) = spec.source.clone().or_else(|| context.data.clone()) else {
                    tracing::debug!(path = %spec.path, "bind without a data source ignored");
                    return;
                };
                self.inner
                    .binder
                    .bind(node, &store, &spec.path, spec.filter.clone());
            }
            Directive::Watch(spec) => self.apply_watch(node, index, spec, context),
            Directive::OnState(spec) => {
                let store = spec.source.clone().or_else(|| context.state.clone());
                self.apply_state(node, index, spec, store, context);
            }
            Directive::OnSet(spec) => {
                let store = spec.source.clone().or_else(|| context.data.clone());
                self.apply_state(node, index, spec, store, context);
            }
            Directive::Route(route) => match self.router() {
                Some(router) => router.route(node, route, context),
                None => tracing::debug!("route directive without a router ignored"),
            },
            Directive::Switch(switch) => match self.router() {
                Some(router) => router.switch(node, switch, context),
                None => tracing::debug!("switch directive without a router ignored"),
            },
            Directive::OnCreated(_) | Directive::Cache(_) | Directive::Data(_) | Directive::State(_) => {}
        }
    }

    fn router(&self) -> Option<Rc<dyn Router>> {
        self.inner.router.borrow().clone()
    }

    fn apply_watch(&self, node: NodeId, index: usize, spec: &WatchSpec, context: &BuildContext) {
        let sources: Vec<StoreRef> = if spec.sources.is_empty() {
            context.data.iter().cloned().collect()
        } else {
            spec.sources.clone()
        };
        if sources.is_empty() {
            tracing::debug!(template = spec.template.source(), "watch without a data source ignored");
            return;
        }

        let bound: Vec<(String, StoreRef)> = spec
            .template
            .placeholders()
            .into_iter()
            .enumerate()
            .filter_map(|(i, name)| {
                let store = if sources.len() == 1 {
                    sources.first()
                } else {
                    sources.get(i)
                }?;
                Some((name.to_owned(), store.clone()))
            })
            .collect();
        let bound = Rc::new(bound);

        let refresh: Rc<dyn Fn()> = {
            let bound = Rc::clone(&bound);
            let template = spec.template.clone();
            let target = self.inner.target.clone();
            let watch_target = spec.target.clone();
            Rc::new(move || match &watch_target {
                WatchTarget::Attribute(attribute) => {
                    let text = template.render(|name| {
                        bound
                            .iter()
                            .find(|(bound_name, _)| bound_name == name)
                            .and_then(|(path, store)| store.get(Some(path)))
                    });
                    target.set_attribute(node, attribute, Value::String(text));
                }
                WatchTarget::Callback(callback) => {
                    let values: Vec<Option<Value>> = bound
                        .iter()
                        .map(|(path, store)| store.get(Some(path)))
                        .collect();
                    callback(node, &values);
                }
            })
        };

        for (path, store) in bound.iter() {
            let refresh = Rc::clone(&refresh);
            let kind = format!("layout:{index}:{}:{}", store.id(), store.canonical(path));
            self.inner
                .binder
                .watch_as(node, &kind, store, path, move |_| refresh());
        }
    }

    fn apply_state(
        &self,
        node: NodeId,
        index: usize,
        spec: &StateSpec,
        store: Option<StoreRef>,
        context: &BuildContext,
    ) {
        let Some(store) = store else {
            tracing::debug!(path = %spec.path, "state directive without a store ignored");
            return;
        };
        let kind = format!("layout:{index}:{}:{}", store.id(), store.canonical(&spec.path));
        match &spec.action {
            StateAction::Classes(table) => {
                let target = self.inner.target.clone();
                let table = table.clone();
                self.inner.binder.watch_as(node, &kind, &store, &spec.path, move |change| {
                    apply_classes(target.as_ref(), node, &table, change.value.as_ref());
                });
            }
            StateAction::Render(render) => {
                let weak = Rc::downgrade(&self.inner);
                let render = Rc::clone(render);
                let path = store.canonical(&spec.path);
                let context = context.clone();
                self.inner.binder.watch_as(node, &kind, &store, &spec.path, move |change| {
                    if let Some(inner) = weak.upgrade() {
                        LayoutBuilder { inner }.render_into(
                            node,
                            &path,
                            change.value.as_ref(),
                            &render,
                            &context,
                        );
                    }
                });
            }
        }
    }

    fn render_into(
        &self,
        node: NodeId,
        path: &str,
        value: Option<&Value>,
        render: &RenderFn,
        context: &BuildContext,
    ) {
        let target = &self.inner.target;
        if !target.contains(node) {
            return;
        }
        let key = state_key(path, value);
        if context.persist && self.restore(node, &key).is_some() {
            return;
        }
        match render(value) {
            Rendered::Layouts(layouts) => {
                target.remove_attribute(node, TEXT);
                target.remove_attribute(node, MARKUP);
                if context.persist {
                    self.rebuild_cached(node, &key, context, move || layouts);
                } else {
                    self.rebuild(node, &layouts, context);
                }
            }
            Rendered::Text(text) => {
                self.clear(node);
                target.remove_attribute(node, MARKUP);
                target.set_attribute(node, TEXT, Value::String(text));
            }
            Rendered::Markup(markup) => {
                self.clear(node);
                target.remove_attribute(node, TEXT);
                target.set_attribute(node, MARKUP, Value::String(markup));
            }
            Rendered::Nothing => {
                self.clear(node);
            }
        }
    }
}

/// Each class is present iff the watched value matches its table value.
fn apply_classes(target: &dyn RenderTarget, node: NodeId, table: &[(String, String)], value: Option<&Value>) {
    let shown = display(value);
    for (expected, class) in table {
        if *expected != shown {
            target.remove_class(node, class);
        }
    }
    for (expected, class) in table {
        if *expected == shown {
            target.add_class(node, class);
        }
    }
}
