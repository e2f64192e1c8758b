//! Node arena and the render-target capability.

pub mod node;
pub mod query;
pub mod target;
pub mod tree;

pub use node::{NodeData, NodeId};
pub use target::{
    InteractionListener, ListenerId, MemoryTarget, RemovalHook, RenderTarget, TargetRef,
};
pub use tree::Dom;
