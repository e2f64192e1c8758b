//! Deep store: nested values addressed by path, staged against a committed
//! snapshot.
//!
//! Two buffers back a [`DataStore`]:
//!
//! - `stage` holds current values, including edits that arrived through
//!   bindings.
//! - `attributes` holds the last externally committed snapshot.
//!
//! A write without a committer is authoritative and lands in both buffers.
//! A write with a committer (a bound edit) lands in `stage` only and marks the
//! store dirty, so [`DataStore::revert`] can restore the committed values.
//!
//! Publishing is multi-level: the written path first, then every descendant
//! of the new value in pre-order (`user`, `user.name`, `user.tags`,
//! `user.tags[0]`, ...), then every descendant that existed before the write
//! but is gone now, with value `None`. Each path is published once per write.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use super::{Bus, Change, ChangeFn, Channels, Committer, ReactiveStore, StoreId};
use crate::path::{descendants, Path};
use crate::pubsub::Token;
use crate::value::{merge, Map, Value};

struct Buffers {
    stage: Value,
    attributes: Value,
    dirty: bool,
}

/// A path-aware store with revert support.
pub struct DataStore {
    channels: Channels,
    buffers: RefCell<Buffers>,
}

impl DataStore {
    pub fn new(bus: &Bus) -> Rc<Self> {
        Self::with_values(bus, Map::new())
    }

    /// Create a store whose committed snapshot is `values`.
    pub fn with_values(bus: &Bus, values: Map<String, Value>) -> Rc<Self> {
        let root = Value::Object(values);
        Rc::new(Self {
            channels: Channels::new(bus),
            buffers: RefCell::new(Buffers {
                stage: root.clone(),
                attributes: root,
                dirty: false,
            }),
        })
    }

    /// Whether bound edits are staged but not committed.
    pub fn is_dirty(&self) -> bool {
        self.buffers.borrow().dirty
    }

    /// The committed snapshot.
    pub fn committed(&self) -> Value {
        self.buffers.borrow().attributes.clone()
    }

    /// Fold staged values into the committed snapshot and clear the dirty flag.
    pub fn merge_stage(&self) {
        let mut buffers = self.buffers.borrow_mut();
        let Buffers {
            stage, attributes, ..
        } = &mut *buffers;
        merge(attributes, stage);
        buffers.dirty = false;
    }

    /// Restore `stage` from the committed snapshot.
    ///
    /// Every top-level attribute whose value changes is published (as an
    /// external write) so bound nodes follow. Returns how many attributes
    /// changed.
    pub fn revert(&self) -> usize {
        let (before, after) = {
            let mut buffers = self.buffers.borrow_mut();
            let restored = buffers.attributes.clone();
            let before = std::mem::replace(&mut buffers.stage, restored);
            buffers.dirty = false;
            (before, buffers.stage.clone())
        };

        let mut keys: Vec<String> = Vec::new();
        for root in [&before, &after] {
            if let Value::Object(map) = root {
                for key in map.keys() {
                    if !keys.contains(key) {
                        keys.push(key.clone());
                    }
                }
            }
        }

        let mut changed = 0;
        for key in keys {
            let old = before.get(&key).cloned();
            let new = after.get(&key).cloned();
            if old != new {
                changed += 1;
                self.publish_tree(&Path::literal(key), new, old, None);
            }
        }
        tracing::debug!(store = %self.channels.id, changed, "revert");
        changed
    }

    fn publish_tree(
        &self,
        path: &Path,
        value: Option<Value>,
        previous: Option<Value>,
        committer: Option<Committer>,
    ) {
        let mut nested: Vec<Change> = Vec::new();
        let mut published: HashSet<String> = HashSet::new();

        if let Some(current) = &value {
            for (relative, child) in descendants(current) {
                let absolute = path.join(&relative).to_string();
                let old = previous.as_ref().and_then(|p| relative.resolve(p)).cloned();
                published.insert(absolute.clone());
                nested.push(
                    Change::new(absolute, Some(child.clone()))
                        .with_previous(old)
                        .with_committer(committer),
                );
            }
        }
        if let Some(old) = &previous {
            for (relative, child) in descendants(old) {
                let absolute = path.join(&relative).to_string();
                if published.insert(absolute.clone()) {
                    nested.push(
                        Change::new(absolute, None)
                            .with_previous(Some(child.clone()))
                            .with_committer(committer),
                    );
                }
            }
        }

        self.channels.announce(
            &Change::new(path.to_string(), value)
                .with_previous(previous)
                .with_committer(committer),
        );
        for change in &nested {
            self.channels.announce(change);
        }
    }
}

impl ReactiveStore for DataStore {
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
        let buffers = self.buffers.borrow();
        match path {
            None => {
                let mut merged = buffers.attributes.clone();
                merge(&mut merged, &buffers.stage);
                Some(merged)
            }
            Some(raw) => {
                let path = Path::parse_lenient(raw);
                path.resolve(&buffers.stage)
                    .or_else(|| path.resolve(&buffers.attributes))
                    .cloned()
            }
        }
    }

    fn set(&self, path: &str, value: Value, committer: Option<Committer>) {
        let path = Path::parse_lenient(path);
        let previous = {
            let mut buffers = self.buffers.borrow_mut();
            let previous = path.resolve(&buffers.stage).cloned();
            if let Err(err) = path.assign(&mut buffers.stage, value.clone()) {
                tracing::warn!(store = %self.channels.id, %path, error = %err, "write dropped");
                return;
            }
            let committed = match committer {
                None => path.assign(&mut buffers.attributes, value.clone()).is_ok(),
                Some(_) => false,
            };
            // A staged value the snapshot could not take stays uncommitted.
            if !committed {
                buffers.dirty = true;
            }
            previous
        };
        self.publish_tree(&path, Some(value), previous, committer);
    }

    fn delete(&self, path: Option<&str>) {
        match path {
            Some(raw) => {
                let path = Path::parse_lenient(raw);
                let previous = {
                    let mut buffers = self.buffers.borrow_mut();
                    let staged = path.remove(&mut buffers.stage);
                    let committed = path.remove(&mut buffers.attributes);
                    staged.or(committed)
                };
                if previous.is_some() {
                    self.publish_tree(&path, None, previous, None);
                }
            }
            None => {
                let previous = {
                    let mut buffers = self.buffers.borrow_mut();
                    let mut merged = std::mem::replace(
                        &mut buffers.attributes,
                        Value::Object(Map::new()),
                    );
                    let staged =
                        std::mem::replace(&mut buffers.stage, Value::Object(Map::new()));
                    merge(&mut merged, &staged);
                    buffers.dirty = false;
                    merged
                };
                if let Value::Object(map) = previous {
                    for (key, old) in map {
                        self.publish_tree(&Path::literal(key), None, Some(old), None);
                    }
                }
            }
        }
    }

    fn on(&self, path: &str, callback: ChangeFn) -> Token {
        self.channels.on(&self.canonical(path), callback)
    }

    fn off(&self, path: &str, token: Token) {
        self.channels.off(&self.canonical(path), token);
    }

    fn canonical(&self, path: &str) -> String {
        Path::parse_lenient(path).to_string()
    }
}
