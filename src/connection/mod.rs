//! Binding endpoints, connections and the per-node connection registry.
//!
//! A *source* wraps one endpoint: a store attribute ([`DataSource`]) or a
//! node attribute ([`NodeSource`]). A *connection* owns one or two sources
//! and tears them down together. The [`ConnectionTracker`] groups
//! connections by node so a removed node can release everything at once.

pub mod link;
pub mod source;
pub mod tracker;

pub use link::{Connection, OneWayConnection, TwoWayConnection};
pub use source::{
    infer_attribute, is_boolean_attribute, DataEndpoint, DataSource, NodeEndpoint, NodeSignal,
    NodeSource,
};
pub use tracker::{BindId, ConnectionTracker};

use crate::pubsub::Token;
use crate::store::{Bus, Change};

/// Misuse of the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection has no data source")]
    MissingData,
    #[error("connection has no element source")]
    MissingElement,
    #[error("connection was unsubscribed and cannot be reused")]
    Closed,
}

/// One live bus subscription, cancelled on drop.
pub struct Subscription {
    bus: Bus,
    topic: String,
    token: Option<Token>,
}

impl Subscription {
    pub fn open(bus: &Bus, topic: impl Into<String>, callback: impl Fn(&Change) + 'static) -> Self {
        let topic = topic.into();
        let token = bus.subscribe(topic.clone(), callback);
        Self {
            bus: bus.clone(),
            topic,
            token: Some(token),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn token(&self) -> Option<Token> {
        self.token
    }

    pub fn is_active(&self) -> bool {
        self.token
            .is_some_and(|token| self.bus.is_subscribed(&self.topic, token))
    }

    /// Remove the subscription. Safe to call repeatedly, and safe after the
    /// topic itself was dropped from the bus.
    pub fn cancel(&mut self) -> bool {
        match self.token.take() {
            Some(token) => self.bus.unsubscribe(&self.topic, token),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("token", &self.token)
            .finish()
    }
}
