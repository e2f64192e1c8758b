//! Shallow store: flat keys, idempotent scalar writes.

use std::cell::RefCell;
use std::rc::Rc;

use super::{Bus, Change, ChangeFn, Channels, Committer, ReactiveStore, StoreId};
use crate::pubsub::Token;
use crate::value::{is_scalar, Map, Value};

/// Local topic fired for every attribute change.
const ANY_CHANGE: &str = "change";

/// A flat key/value store.
///
/// Keys are never split: `set("a.b", ..)` writes the key `"a.b"`. Writing a
/// scalar equal to the current scalar publishes nothing.
pub struct Store {
    channels: Channels,
    stage: RefCell<Map<String, Value>>,
}

impl Store {
    pub fn new(bus: &Bus) -> Rc<Self> {
        Self::with_values(bus, Map::new())
    }

    /// Create a store seeded with `values` (no notifications).
    pub fn with_values(bus: &Bus, values: Map<String, Value>) -> Rc<Self> {
        Rc::new(Self {
            channels: Channels::new(bus),
            stage: RefCell::new(values),
        })
    }

    /// Subscribe to every attribute change.
    pub fn on_any(&self, callback: ChangeFn) -> Token {
        self.channels.local.subscribe(ANY_CHANGE, callback)
    }

    pub fn off_any(&self, token: Token) {
        self.channels.local.unsubscribe(ANY_CHANGE, token);
    }

    pub fn keys(&self) -> Vec<String> {
        self.stage.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.stage.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stage.borrow().is_empty()
    }

    fn announce(&self, change: Change) {
        self.channels.announce(&change);
        self.channels.local.publish(ANY_CHANGE, &change);
    }
}

impl ReactiveStore for Store {
    fn id(&self) -> StoreId {
        self.channels.id
    }

    fn committer(&self) -> Committer {
        self.channels.committer
    }

    fn bus(&self) -> &Bus {
        &self.channels.bus
    }

    fn get(&self, path: Option<&str>) -> Option<Value> {
        let stage = self.stage.borrow();
        match path {
            None => Some(Value::Object(stage.clone())),
            Some(key) => stage.get(key).cloned(),
        }
    }

    fn set(&self, path: &str, value: Value, committer: Option<Committer>) {
        let previous = {
            let mut stage = self.stage.borrow_mut();
            if let Some(current) = stage.get(path) {
                if is_scalar(current) && is_scalar(&value) && *current == value {
                    tracing::trace!(store = %self.channels.id, path, "unchanged scalar, not published");
                    return;
                }
            }
            stage.insert(path.to_owned(), value.clone())
        };
        self.announce(
            Change::new(path, Some(value))
                .with_previous(previous)
                .with_committer(committer),
        );
    }

    fn delete(&self, path: Option<&str>) {
        let removed: Vec<(String, Value)> = {
            let mut stage = self.stage.borrow_mut();
            match path {
                Some(key) => stage
                    .remove(key)
                    .map(|v| vec![(key.to_owned(), v)])
                    .unwrap_or_default(),
                None => std::mem::take(&mut *stage).into_iter().collect(),
            }
        };
        for (key, previous) in removed {
            self.announce(Change::new(key, None).with_previous(Some(previous)));
        }
    }

    fn on(&self, path: &str, callback: ChangeFn) -> Token {
        self.channels.on(path, callback)
    }

    fn off(&self, path: &str, token: Token) {
        self.channels.off(path, token);
    }
}
