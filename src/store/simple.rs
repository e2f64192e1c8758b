//! Literal-key store backing named state targets.

use std::cell::RefCell;
use std::rc::Rc;

use super::{Bus, Change, ChangeFn, Channels, Committer, ReactiveStore, StoreId};
use crate::pubsub::Token;
use crate::value::{is_scalar, Map, Value};

/// A flat store whose keys are never interpreted as paths.
///
/// State targets declare their actions up front with
/// [`add_action`](SimpleStore::add_action); anything may still be written
/// later with `set`.
pub struct SimpleStore {
    channels: Channels,
    values: RefCell<Map<String, Value>>,
}

impl SimpleStore {
    pub fn new(bus: &Bus) -> Rc<Self> {
        Rc::new(Self {
            channels: Channels::new(bus),
            values: RefCell::new(Map::new()),
        })
    }

    /// Declare an action with an initial value. Existing actions keep their
    /// value. Nothing is published. Returns whether the action was new.
    pub fn add_action(&self, name: &str, initial: Value) -> bool {
        let mut values = self.values.borrow_mut();
        if values.contains_key(name) {
            return false;
        }
        values.insert(name.to_owned(), initial);
        true
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.values.borrow().contains_key(name)
    }

    /// Declared action names in insertion order.
    pub fn actions(&self) -> Vec<String> {
        self.values.borrow().keys().cloned().collect()
    }
}

impl ReactiveStore for SimpleStore {
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
        let values = self.values.borrow();
        match path {
            None => Some(Value::Object(values.clone())),
            Some(key) => values.get(key).cloned(),
        }
    }

    fn set(&self, path: &str, value: Value, committer: Option<Committer>) {
        let previous = {
            let mut values = self.values.borrow_mut();
            let unchanged = values
                .get(path)
                .is_some_and(|current| is_scalar(current) && *current == value);
            if unchanged {
                return;
            }
            values.insert(path.to_owned(), value.clone())
        };
        self.channels.announce(
            &Change::new(path, Some(value))
                .with_previous(previous)
                .with_committer(committer),
        );
    }

    fn delete(&self, path: Option<&str>) {
        let removed: Vec<(String, Value)> = {
            let mut values = self.values.borrow_mut();
            match path {
                Some(key) => values
                    .remove(key)
                    .map(|v| vec![(key.to_owned(), v)])
                    .unwrap_or_default(),
                None => std::mem::take(&mut *values).into_iter().collect(),
            }
        };
        for (key, previous) in removed {
            self.channels
                .announce(&Change::new(key, None).with_previous(Some(previous)));
        }
    }

    fn on(&self, path: &str, callback: ChangeFn) -> Token {
        self.channels.on(path, callback)
    }

    fn off(&self, path: &str, token: Token) {
        self.channels.off(path, token);
    }
}
