//! Per-node connection registry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::link::Connection;

/// Binder-local identity of a bound node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindId(u64);

impl BindId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BindId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Connections keyed by bound node, then by binding kind (`"bind"`,
/// `"watch:{store}:{path}"`, ...).
#[derive(Default)]
pub struct ConnectionTracker {
    entries: HashMap<BindId, HashMap<String, Connection>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. An existing connection under the same key is
    /// unsubscribed and returned.
    pub fn add(&mut self, id: BindId, kind: impl Into<String>, connection: Connection) -> Option<Connection> {
        let replaced = self
            .entries
            .entry(id)
            .or_default()
            .insert(kind.into(), connection);
        replaced.map(|mut old| {
            old.unsubscribe();
            old
        })
    }

    pub fn get(&self, id: BindId, kind: &str) -> Option<&Connection> {
        self.entries.get(&id).and_then(|kinds| kinds.get(kind))
    }

    pub fn get_mut(&mut self, id: BindId, kind: &str) -> Option<&mut Connection> {
        self.entries.get_mut(&id).and_then(|kinds| kinds.get_mut(kind))
    }

    pub fn contains(&self, id: BindId, kind: &str) -> bool {
        self.get(id, kind).is_some()
    }

    /// Unsubscribe and forget one connection, or every connection under `id`
    /// when `kind` is `None`. Returns how many were removed.
    pub fn remove(&mut self, id: BindId, kind: Option<&str>) -> usize {
        let mut removed: Vec<Connection> = Vec::new();
        match kind {
            Some(kind) => {
                if let Some(kinds) = self.entries.get_mut(&id) {
                    removed.extend(kinds.remove(kind));
                    if kinds.is_empty() {
                        self.entries.remove(&id);
                    }
                }
            }
            None => {
                if let Some(kinds) = self.entries.remove(&id) {
                    removed.extend(kinds.into_values());
                }
            }
        }
        for connection in &mut removed {
            connection.unsubscribe();
        }
        removed.len()
    }

    /// Connections registered under `id`.
    pub fn count(&self, id: BindId) -> usize {
        self.entries.get(&id).map_or(0, HashMap::len)
    }

    /// Binding kinds registered under `id`, sorted.
    pub fn kinds(&self, id: BindId) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .entries
            .get(&id)
            .map(|k| k.keys().cloned().collect())
            .unwrap_or_default();
        kinds.sort();
        kinds
    }

    /// Total connections across all nodes.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unsubscribe everything. Returns how many connections were dropped.
    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        for (_, kinds) in self.entries.drain() {
            for (_, mut connection) in kinds {
                connection.unsubscribe();
                dropped += 1;
            }
        }
        dropped
    }
}
