//! Node-originated interactions delivered to interaction listeners.

use super::input::{Key, KeyEvent};
use crate::dom::NodeId;

/// Keys whose lone press never edits a node's value.
pub const DEFAULT_IGNORED_KEYS: &[Key] = &[
    Key::Shift,
    Key::Control,
    Key::Alt,
    Key::Meta,
    Key::CapsLock,
    Key::Escape,
    Key::Tab,
    Key::BackTab,
    Key::Left,
    Key::Right,
    Key::Up,
    Key::Down,
    Key::Home,
    Key::End,
    Key::PageUp,
    Key::PageDown,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    /// The node's value changed while being edited.
    Input,
    /// The node's value was committed (checkbox toggled, select changed, ...).
    Change,
    Key(KeyEvent),
    Click,
}

/// An interaction on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub node: NodeId,
    pub kind: InteractionKind,
}

impl Interaction {
    pub fn input(node: NodeId) -> Self {
        Self {
            node,
            kind: InteractionKind::Input,
        }
    }

    pub fn change(node: NodeId) -> Self {
        Self {
            node,
            kind: InteractionKind::Change,
        }
    }

    pub fn key(node: NodeId, event: KeyEvent) -> Self {
        Self {
            node,
            kind: InteractionKind::Key(event),
        }
    }

    pub fn click(node: NodeId) -> Self {
        Self {
            node,
            kind: InteractionKind::Click,
        }
    }

    /// Whether the interaction may have edited the node's value.
    ///
    /// Clicks never do. Key presses do unless the key is in `ignored`.
    pub fn may_edit(&self, ignored: &[Key]) -> bool {
        match self.kind {
            InteractionKind::Input | InteractionKind::Change => true,
            InteractionKind::Key(event) => !ignored.contains(&event.code),
            InteractionKind::Click => false,
        }
    }
}
