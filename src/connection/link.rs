//! Two-way and one-way connections.

use crate::store::Change;
use crate::value::{has_data, Value};

use super::source::{DataEndpoint, DataSource, NodeSignal, NodeSource};
use super::ConnectionError;

/// Store attribute ↔ node attribute.
///
/// Node edits reach the store under the node endpoint's committer, and the
/// store side skips changes carrying that committer. That check is the only
/// thing that stops a bound edit from being written back into the node it
/// came from. Store writes into the node set the attribute directly and are
/// never announced on the node topic, so that direction needs no guard.
#[derive(Default)]
pub struct TwoWayConnection {
    data: Option<DataSource>,
    element: Option<NodeSource>,
    closed: bool,
}

impl TwoWayConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_data(&mut self, endpoint: DataEndpoint) -> &mut Self {
        self.data = Some(DataSource::new(endpoint));
        self
    }

    pub fn add_element(&mut self, source: NodeSource) -> &mut Self {
        self.element = Some(source);
        self
    }

    pub fn data(&self) -> Option<&DataSource> {
        self.data.as_ref()
    }

    pub fn element(&self) -> Option<&NodeSource> {
        self.element.as_ref()
    }

    /// Subscribe both directions.
    pub fn bind(&mut self) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        let data = self.data.as_mut().ok_or(ConnectionError::MissingData)?;
        let element = self.element.as_mut().ok_or(ConnectionError::MissingElement)?;

        let node_committer = element.endpoint().committer();

        let store_side = data.endpoint().clone();
        element.subscribe(move |change: &Change| {
            store_side.write(change.value.clone().unwrap_or(Value::Null), Some(node_committer));
        });

        let node_side = element.endpoint().clone();
        data.subscribe(move |change: &Change| {
            if change.is_from(node_committer) {
                tracing::trace!(attribute = node_side.attribute(), "store change came from the node, skipped");
                return;
            }
            node_side.write(change.value.as_ref());
        });
        Ok(())
    }

    /// First-bind precedence: store data wins; otherwise non-blank node data
    /// is written into the store as a bound write.
    pub fn synchronize(&self) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        let data = self.data.as_ref().ok_or(ConnectionError::MissingData)?.endpoint();
        let element = self.element.as_ref().ok_or(ConnectionError::MissingElement)?.endpoint();

        let stored = data.read();
        if has_data(stored.as_ref(), false) {
            element.write(stored.as_ref());
        } else if let Some(current) = element.read().filter(|v| has_data(Some(v), true)) {
            data.write(current, Some(element.committer()));
        }
        Ok(())
    }

    /// A handle that re-announces the node's value, if the connection is live.
    pub fn signal(&self) -> Option<NodeSignal> {
        if !self.is_live() {
            return None;
        }
        self.element.as_ref().map(NodeSource::signal)
    }

    /// Announce the node's current value toward the store.
    pub fn publish_element(&self) -> usize {
        self.signal().map_or(0, |signal| signal.publish())
    }

    pub fn is_live(&self) -> bool {
        !self.closed
            && self.data.as_ref().is_some_and(DataSource::is_subscribed)
            && self.element.as_ref().is_some_and(NodeSource::is_subscribed)
    }

    /// Tear down both sources. The connection cannot be bound again.
    pub fn unsubscribe(&mut self) {
        if let Some(data) = self.data.as_mut() {
            data.unsubscribe();
        }
        if let Some(element) = self.element.as_mut() {
            element.unsubscribe();
        }
        self.closed = true;
    }
}

/// Store attribute → caller-supplied callback.
pub struct OneWayConnection {
    source: DataSource,
    closed: bool,
}

impl OneWayConnection {
    pub fn new(endpoint: DataEndpoint) -> Self {
        Self {
            source: DataSource::new(endpoint),
            closed: false,
        }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn watch(&mut self, callback: impl Fn(&Change) + 'static) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        self.source.subscribe(callback);
        Ok(())
    }

    pub fn is_live(&self) -> bool {
        !self.closed && self.source.is_subscribed()
    }

    pub fn unsubscribe(&mut self) {
        self.source.unsubscribe();
        self.closed = true;
    }
}

/// Either connection kind, as stored in the tracker.
pub enum Connection {
    TwoWay(TwoWayConnection),
    OneWay(OneWayConnection),
}

impl Connection {
    pub fn unsubscribe(&mut self) {
        match self {
            Connection::TwoWay(c) => c.unsubscribe(),
            Connection::OneWay(c) => c.unsubscribe(),
        }
    }

    pub fn is_live(&self) -> bool {
        match self {
            Connection::TwoWay(c) => c.is_live(),
            Connection::OneWay(c) => c.is_live(),
        }
    }

    pub fn as_two_way(&self) -> Option<&TwoWayConnection> {
        match self {
            Connection::TwoWay(c) => Some(c),
            Connection::OneWay(_) => None,
        }
    }
}

impl From<TwoWayConnection> for Connection {
    fn from(c: TwoWayConnection) -> Self {
        Connection::TwoWay(c)
    }
}

impl From<OneWayConnection> for Connection {
    fn from(c: OneWayConnection) -> Self {
        Connection::OneWay(c)
    }
}
