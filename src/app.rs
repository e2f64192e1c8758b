//! App struct: one binding session.
//!
//! [`App`] owns the shared bus, an in-memory render target with a root node,
//! the [`Binder`], the [`LayoutBuilder`] and the [`StateController`]. Nothing
//! here is global; every session is an explicitly constructed value, so tests
//! can run as many isolated apps as they like.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::binder::{Binder, BinderConfig};
use crate::dom::{MemoryTarget, NodeId, RenderTarget};
use crate::event::{Interaction, KeyEvent};
use crate::layout::{BuildContext, Layout, LayoutBuilder};
use crate::state::StateController;
use crate::store::{Bus, DataStore, Store};
use crate::testing::snapshot::render_filtered;
use crate::value::Value;

/// Node kind of the app's root.
pub const ROOT_KIND: &str = "root";

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Configuration for the application.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Binder settings: bind-id attribute, ignored keys, node topic prefix.
    pub binder: BinderConfig,
    /// Seed for the persist flag of [`App::context`].
    pub persist: bool,
}

impl AppConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the binder config (builder).
    pub fn with_binder(mut self, binder: BinderConfig) -> Self {
        self.binder = binder;
        self
    }

    /// Cache rebuilt subtrees by default (builder).
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// A binding session.
pub struct App {
    bus: Bus,
    target: Rc<MemoryTarget>,
    binder: Binder,
    builder: LayoutBuilder,
    states: StateController,
    config: AppConfig,
    root: NodeId,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let bus = Bus::new();
        let target = MemoryTarget::new();
        let binder = Binder::with_config(&bus, target.clone(), config.binder.clone());
        let builder = LayoutBuilder::new(&binder);
        let states = StateController::new(&bus);
        let root = target.create_node(ROOT_KIND, &BTreeMap::new());
        tracing::debug!(persist = config.persist, "app created");
        Self {
            bus,
            target,
            binder,
            builder,
            states,
            config,
            root,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn target(&self) -> &Rc<MemoryTarget> {
        &self.target
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    pub fn builder(&self) -> &LayoutBuilder {
        &self.builder
    }

    pub fn states(&self) -> &StateController {
        &self.states
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ── Stores ───────────────────────────────────────────────────────

    /// A new deep store on this session's bus.
    pub fn data_store(&self) -> Rc<DataStore> {
        DataStore::new(&self.bus)
    }

    /// A new shallow store on this session's bus.
    pub fn store(&self) -> Rc<Store> {
        Store::new(&self.bus)
    }

    // ── Tree ─────────────────────────────────────────────────────────

    /// Root build context, with the configured persist flag.
    pub fn context(&self) -> BuildContext {
        BuildContext::new().with_persist(self.config.persist)
    }

    /// Build `layout` and append it under the root.
    pub fn mount(&self, layout: &Layout, context: &BuildContext) -> NodeId {
        let node = self.builder.build(layout, context);
        self.target.append_child(self.root, node);
        node
    }

    /// Destroy a mounted subtree, releasing its bindings. The root itself
    /// cannot be unmounted.
    pub fn unmount(&self, node: NodeId) -> bool {
        if node == self.root {
            return false;
        }
        self.target.remove_node(node)
    }

    /// First node whose attribute `name` equals `value`.
    pub fn find(&self, name: &str, value: impl Into<Value>) -> Option<NodeId> {
        self.target.find(name, &value.into())
    }

    // ── Input ────────────────────────────────────────────────────────

    /// Dispatch a terminal key press on `node`. Returns how many listeners
    /// saw it.
    pub fn handle_key(&self, node: NodeId, event: crossterm::event::KeyEvent) -> usize {
        self.dispatch(Interaction::key(node, KeyEvent::from(event)))
    }

    pub fn dispatch(&self, interaction: Interaction) -> usize {
        self.target.dispatch(interaction)
    }

    /// Plain-text rendering of the mounted tree, without bind ids.
    pub fn render(&self) -> String {
        render_filtered(
            &self.target,
            self.root,
            &[self.config.binder.id_attribute.as_str()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ReactiveStore;
    use crossterm::event::{KeyCode, KeyModifiers};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn config_builders() {
        let config = AppConfig::new()
            .with_persist(true)
            .with_binder(BinderConfig::new().with_id_attribute("data-id"));
        assert!(config.persist);
        assert_eq!(config.binder.id_attribute, "data-id");
        let app = App::with_config(config);
        assert!(app.context().persist);
        assert!(!App::new().context().persist);
    }

    #[test]
    fn mount_and_unmount() {
        let app = App::new();
        let store = app.data_store();
        let data: crate::store::StoreRef = store.clone();
        let node = app.mount(
            &Layout::new("input").attr("name", "email").bind("email"),
            &app.context().with_data(&data),
        );
        assert_eq!(app.target().parent(node), Some(app.root()));
        assert_eq!(app.find("name", "email"), Some(node));
        assert_eq!(app.binder().len(), 1);

        assert!(!app.unmount(app.root()));
        assert!(app.unmount(node));
        assert!(app.binder().is_empty());
        store.set("email", json!("x"), None);
        assert_eq!(app.find("name", "email"), None);
    }

    #[test]
    fn terminal_keys_drive_bound_nodes() {
        let app = App::new();
        let store = app.store();
        let data: crate::store::StoreRef = store.clone();
        let node = app.mount(&Layout::new("input").bind("q"), &app.context().with_data(&data));
        app.target().set_attribute(node, "value", json!("ab"));

        let shift = crossterm::event::KeyEvent::new(KeyCode::Modifier(
            crossterm::event::ModifierKeyCode::LeftShift,
        ), KeyModifiers::SHIFT);
        app.handle_key(node, shift);
        assert_eq!(store.get(Some("q")), None);

        app.handle_key(node, crossterm::event::KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE));
        assert_eq!(store.get(Some("q")), Some(json!("ab")));
    }

    #[test]
    fn render_hides_bind_ids() {
        let app = App::new();
        let store: crate::store::StoreRef = app.data_store();
        store.set("name", json!("Ada"), None);
        app.mount(
            &Layout::new("p").watch("Hi [[name]]", "text"),
            &app.context().with_data(&store),
        );
        assert_eq!(app.render(), "<root>\n  <p text=\"Hi Ada\">");
    }
}
