//! Tree operations: insert, append, detach, remove, walk.

use slotmap::{SecondaryMap, SlotMap};

use super::node::{NodeData, NodeId};

const EMPTY_CHILDREN: &[NodeId] = &[];

/// Node arena backed by a slotmap.
///
/// Nodes may exist detached (no parent); a built layout is attached to its
/// container with [`Dom::append`]. Parent/child links live in secondary maps,
/// so removal is O(subtree size) and lookup is O(1).
pub struct Dom {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
}

impl Dom {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
        }
    }

    /// Insert a detached node.
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        id
    }

    /// Insert a node as the last child of `parent`. Returns `None` if the
    /// parent does not exist.
    pub fn insert_child(&mut self, parent: NodeId, data: NodeData) -> Option<NodeId> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        let id = self.insert(data);
        self.link(parent, id);
        Some(id)
    }

    /// Move `node` (with its subtree) to the end of `parent`'s children.
    ///
    /// Refuses to create a cycle: appending a node under itself or under one
    /// of its own descendants returns `false` and changes nothing.
    pub fn append(&mut self, parent: NodeId, node: NodeId) -> bool {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(node) {
            return false;
        }
        if parent == node || self.ancestors(parent).contains(&node) {
            return false;
        }
        self.detach(node);
        self.link(parent, node);
        true
    }

    /// Unlink `node` from its parent, keeping its subtree alive.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(old_parent) = self.parent.remove(node) {
            if let Some(siblings) = self.children.get_mut(old_parent) {
                siblings.retain(|&child| child != node);
            }
        }
    }

    fn link(&mut self, parent: NodeId, node: NodeId) {
        self.parent.insert(node, parent);
        if let Some(kids) = self.children.get_mut(parent) {
            kids.push(node);
        }
    }

    /// Remove a node and all its descendants.
    ///
    /// Returns the `NodeData` for the removed node, or `None` if it didn't exist.
    pub fn remove(&mut self, id: NodeId) -> Option<NodeData> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        self.detach(id);

        let mut removed_root_data = None;
        for current in self.walk_depth_first(id) {
            self.children.remove(current);
            self.parent.remove(current);
            let data = self.nodes.remove(current);
            if current == id {
                removed_root_data = data;
            }
        }
        removed_root_data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Children of a node; empty if it has none or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Reverse so the first child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ```text
    ///       root
    ///      /    \
    ///    a        b
    ///   / \
    ///  c   d
    /// ```
    fn build_tree() -> (Dom, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::new("div"));
        let a = dom.insert_child(root, NodeData::new("ul")).unwrap();
        let b = dom.insert_child(root, NodeData::new("p")).unwrap();
        let c = dom.insert_child(a, NodeData::new("li")).unwrap();
        let d = dom.insert_child(a, NodeData::new("li")).unwrap();
        (dom, root, a, b, c, d)
    }

    #[test]
    fn parent_and_children() {
        let (dom, root, a, b, c, d) = build_tree();
        assert_eq!(dom.parent(a), Some(root));
        assert_eq!(dom.parent(root), None);
        assert_eq!(dom.children(root), &[a, b]);
        assert_eq!(dom.children(a), &[c, d]);
        assert!(dom.children(c).is_empty());
    }

    #[test]
    fn insert_child_under_missing_parent() {
        let mut dom = Dom::new();
        let stale = dom.insert(NodeData::new("x"));
        dom.remove(stale);
        assert_eq!(dom.insert_child(stale, NodeData::new("y")), None);
    }

    #[test]
    fn ancestors() {
        let (dom, root, a, _b, c, _d) = build_tree();
        assert_eq!(dom.ancestors(c), vec![a, root]);
        assert!(dom.ancestors(root).is_empty());
    }

    #[test]
    fn append_moves_subtree() {
        let (mut dom, root, a, b, c, _d) = build_tree();
        assert!(dom.append(b, c));
        assert_eq!(dom.parent(c), Some(b));
        assert!(!dom.children(a).contains(&c));
        assert_eq!(dom.ancestors(c), vec![b, root]);
    }

    #[test]
    fn append_refuses_cycles() {
        let (mut dom, root, a, _b, c, _d) = build_tree();
        assert!(!dom.append(c, a));
        assert!(!dom.append(a, a));
        assert!(!dom.append(c, root));
        assert_eq!(dom.parent(a), Some(root));
    }

    #[test]
    fn detach_keeps_subtree() {
        let (mut dom, root, a, b, c, d) = build_tree();
        dom.detach(a);
        assert_eq!(dom.parent(a), None);
        assert_eq!(dom.children(root), &[b]);
        assert_eq!(dom.children(a), &[c, d]);
        assert_eq!(dom.len(), 5);
    }

    #[test]
    fn remove_subtree() {
        let (mut dom, root, a, b, c, d) = build_tree();
        assert_eq!(dom.remove(a).map(|n| n.kind), Some("ul".to_string()));
        for gone in [a, c, d] {
            assert!(!dom.contains(gone));
        }
        assert_eq!(dom.children(root), &[b]);
        assert_eq!(dom.len(), 2);
        assert!(dom.remove(a).is_none());
    }

    #[test]
    fn walk_depth_first() {
        let (dom, root, a, b, c, d) = build_tree();
        assert_eq!(dom.walk_depth_first(root), vec![root, a, c, d, b]);
        assert_eq!(dom.walk_depth_first(a), vec![a, c, d]);
    }

    #[test]
    fn default_is_empty() {
        let dom = Dom::default();
        assert!(dom.is_empty());
    }
}
