//! Input types and node interactions.

pub mod input;
pub mod interaction;

pub use input::{Key, KeyEvent, Modifiers};
pub use interaction::{Interaction, InteractionKind, DEFAULT_IGNORED_KEYS};
