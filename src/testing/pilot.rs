//! Pilot: programmatic interaction with a headless App.
//!
//! The `Pilot` wraps an [`App`] and simulates user input on its nodes the
//! way a host would deliver it: the node's attribute changes first, then the
//! interaction is dispatched, so bound stores see the edited value.

use crate::app::{App, AppConfig};
use crate::dom::target::{CHECKED, VALUE};
use crate::dom::{NodeId, RenderTarget};
use crate::event::{Interaction, Key, KeyEvent, Modifiers};
use crate::value::{display, Value};

// ---------------------------------------------------------------------------
// Pilot
// ---------------------------------------------------------------------------

/// A headless app driver for testing.
///
/// # Examples
///
/// ```ignore
/// use gilt_bind::layout::Layout;
/// use gilt_bind::testing::Pilot;
///
/// let pilot = Pilot::new();
/// let app = pilot.app();
/// let store = app.data_store();
/// let input = app.mount(&Layout::new("input").bind("name"), &app.context().with_data(&store));
/// pilot.type_text(input, "ada");
/// ```
pub struct Pilot {
    app: App,
}

impl Default for Pilot {
    fn default() -> Self {
        Self::new()
    }
}

impl Pilot {
    pub fn new() -> Self {
        Self { app: App::new() }
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            app: App::with_config(config),
        }
    }

    // ── Input simulation ─────────────────────────────────────────────

    /// Type `text` into `node` one character at a time: each character is
    /// appended to the `value` attribute, then its key press is dispatched.
    pub fn type_text(&self, node: NodeId, text: &str) {
        let target = self.app.target();
        for ch in text.chars() {
            let mut current = display(target.get_attribute(node, VALUE).as_ref());
            current.push(ch);
            target.set_attribute(node, VALUE, Value::String(current));
            self.press_key(node, Key::Char(ch));
        }
    }

    /// Replace `node`'s value wholesale, as a paste would.
    pub fn set_value(&self, node: NodeId, value: &str) -> bool {
        self.app
            .target()
            .input(node, VALUE, Value::String(value.to_owned()))
    }

    /// Set the checked state of a checkbox-like node and dispatch a change.
    pub fn check(&self, node: NodeId, checked: bool) -> bool {
        if !self.app.target().set_attribute(node, CHECKED, Value::Bool(checked)) {
            return false;
        }
        self.app.dispatch(Interaction::change(node));
        true
    }

    /// Simulate a key press with no modifiers.
    pub fn press_key(&self, node: NodeId, key: Key) -> usize {
        self.app.dispatch(Interaction::key(node, KeyEvent::plain(key)))
    }

    /// Simulate a key press with the given modifiers.
    pub fn press_key_with(&self, node: NodeId, key: Key, modifiers: Modifiers) -> usize {
        self.app
            .dispatch(Interaction::key(node, KeyEvent::new(key, modifiers)))
    }

    pub fn click(&self, node: NodeId) -> usize {
        self.app.dispatch(Interaction::click(node))
    }

    // ── Query ────────────────────────────────────────────────────────

    /// Borrow the underlying app.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Current `value` attribute of `node`, or the empty string.
    pub fn value(&self, node: NodeId) -> String {
        display(self.app.target().get_attribute(node, VALUE).as_ref())
    }

    /// Plain-text rendering of the whole app tree.
    pub fn snapshot(&self) -> String {
        self.app.render()
    }
}
