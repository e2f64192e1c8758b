//! Headless testing helpers: Pilot, snapshot rendering.
//!
//! Use the [`Pilot`] to drive an [`App`](crate::app::App) without a host.
//! Use [`render_to_string`] to capture a node tree as plain text for
//! snapshot-style assertions.

pub mod pilot;
pub mod snapshot;

pub use pilot::Pilot;
pub use snapshot::{render_filtered, render_to_string};
