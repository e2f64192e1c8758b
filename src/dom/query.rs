//! Node queries: by attribute, class, kind; generic predicate matching.

use super::node::{NodeData, NodeId};
use super::tree::Dom;
use crate::value::Value;

impl Dom {
    /// First node whose attribute `name` equals `value`, in arena order.
    pub fn query_by_attr(&self, name: &str, value: &Value) -> Option<NodeId> {
        self.iter_nodes()
            .find(|(_, data)| data.attribute(name) == Some(value))
            .map(|(node_id, _)| node_id)
    }

    pub fn query_by_class(&self, class: &str) -> Vec<NodeId> {
        self.query_all(|data| data.has_class(class))
    }

    pub fn query_by_kind(&self, kind: &str) -> Vec<NodeId> {
        self.query_all(|data| data.kind == kind)
    }

    pub fn query_all(&self, predicate: impl Fn(&NodeData) -> bool) -> Vec<NodeId> {
        self.iter_nodes()
            .filter(|(_, data)| predicate(data))
            .map(|(node_id, _)| node_id)
            .collect()
    }

    /// Slotmap insertion order: deterministic, not tree order.
    fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter()
    }
}
