//! Declarative layouts: typed descriptions, a JSON parser, and the builder
//! that turns them into bound node trees.

pub mod builder;
pub mod description;
pub mod parse;

pub use builder::{BuildContext, LayoutBuilder, Router};
pub use description::{
    BindSpec, Directive, Layout, Rendered, StateAction, StateSpec, WatchSpec, WatchTarget,
};
pub use parse::LayoutError;
