//! # gilt-bind
//!
//! Reactive data stores, two-way bindings and a declarative layout builder for
//! UI node trees.
//!
//! Stores publish attribute changes on a shared [`pubsub`] bus. The
//! [`binder`] connects store paths to node attributes in one or both
//! directions, guarding two-way links with committer identities so an update
//! never echoes back to where it came from. The [`layout`] builder turns
//! declarative descriptions into live, bound node trees, and the [`state`]
//! controller keeps named state targets shared across components.
//!
//! ## Core Systems
//!
//! - **[`store`]**: `ReactiveStore` trait; shallow `Store`, deep `DataStore`, `SimpleStore`
//! - **[`pubsub`]**: Topic bus with token-based unsubscription
//! - **[`path`]**: `a.b[0]` path parsing and `serde_json::Value` traversal
//! - **[`template`]**: `[[ placeholder ]]` templates for watches and filters
//! - **[`connection`]**: Data and node endpoints, one-way and two-way connections, tracker
//! - **[`binder`]**: bind / watch / unbind façade over a render target
//! - **[`layout`]**: `Layout` descriptions, JSON parsing, `LayoutBuilder`
//! - **[`state`]**: `StateController` with remote links
//! - **[`dom`]**: Slotmap-backed node arena and the `RenderTarget` capability
//! - **[`event`]**: Keys, modifiers and node interactions
//! - **[`app`]**: Session struct tying everything together
//! - **[`testing`]**: Headless Pilot and snapshot helpers

// Foundation
pub mod path;
pub mod template;
pub mod value;

// Reactivity
pub mod pubsub;
pub mod store;

// Nodes and input
pub mod dom;
pub mod event;

// Binding
pub mod binder;
pub mod connection;

// Declarative trees and shared state
pub mod layout;
pub mod state;

// Application
pub mod app;
pub mod testing;

// Proc macros (feature-gated)
#[cfg(feature = "macros")]
pub use gilt_bind_macros::layout;
