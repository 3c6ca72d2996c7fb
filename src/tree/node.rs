//! Arena-backed parse tree.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`].
//! Children are owned by exactly one parent; the parent link is a plain
//! index. Re-parenting always detaches the node from its previous parent
//! first, so the structure never forms cycles.
//!
//! A node's location is derived from its children on first read and
//! cached. Every structural mutation made through [`Tree`] drops the cache
//! of the mutated node and all its ancestors.

use smol_str::SmolStr;
use std::cell::Cell;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::base::SegmentLocation;
use crate::base::constants::CUSTOM_BLOCK_RULE;
use crate::grammar::SymbolOptions;

/// Index of a node in its [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A parse tree vertex
#[derive(Debug, Clone)]
pub struct NodeData {
    pub symbol: SmolStr,
    /// Structural role overriding the symbol as the node type
    pub alias: Option<SmolStr>,
    /// Display name assigned by the userify pass
    pub userified: Option<SmolStr>,
    /// Token text; non-empty for leaves only
    pub value: Vec<String>,
    options: Rc<SymbolOptions>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    anchor: Cell<Option<SegmentLocation>>,
    anchor_state: Cell<AnchorState>,
}

/// Where the cached location of a node comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnchorState {
    /// Must be recomputed from children
    Stale,
    /// Merged from children
    Derived,
    /// Set explicitly; survives changes below the node
    Explicit,
}

impl NodeData {
    fn new(symbol: SmolStr, options: Rc<SymbolOptions>) -> Self {
        Self {
            symbol,
            alias: None,
            userified: None,
            value: Vec::new(),
            options,
            children: Vec::new(),
            parent: None,
            anchor: Cell::new(None),
            anchor_state: Cell::new(AnchorState::Stale),
        }
    }

    /// Alias if present, else the display name, else the symbol
    pub fn node_type(&self) -> &str {
        match &self.alias {
            Some(alias) if !alias.is_empty() => alias,
            _ => self.userified.as_deref().unwrap_or(&self.symbol),
        }
    }

    pub fn options(&self) -> &SymbolOptions {
        &self.options
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_custom_block(&self) -> bool {
        self.symbol == CUSTOM_BLOCK_RULE
    }
}

/// Arena of parse tree nodes with an optional root
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
    empty_options: Rc<SymbolOptions>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever allocated, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.detach(root);
        self.root = Some(root);
    }

    // =========================================================================
    // Node creation and access
    // =========================================================================

    pub fn new_node(&mut self, symbol: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(NodeData::new(SmolStr::new(symbol), self.empty_options.clone()));
        id
    }

    /// Create a token node with a value and an explicit location
    pub fn new_leaf(&mut self, symbol: &str, value: &str, location: SegmentLocation) -> NodeId {
        let id = self.new_node(symbol);
        self.nodes[id.index()].value.push(value.to_string());
        self.set_location(id, Some(location));
        id
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn node_type(&self, id: NodeId) -> &str {
        self.node(id).node_type()
    }

    pub fn symbol(&self, id: NodeId) -> &str {
        &self.node(id).symbol
    }

    pub fn options(&self, id: NodeId) -> &SymbolOptions {
        &self.node(id).options
    }

    /// Mutable options of a single node. Options shared with other nodes
    /// are copied first.
    pub fn options_mut(&mut self, id: NodeId) -> &mut SymbolOptions {
        Rc::make_mut(&mut self.nodes[id.index()].options)
    }

    pub fn set_options(&mut self, id: NodeId, options: Rc<SymbolOptions>) {
        self.nodes[id.index()].options = options;
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children(id).is_empty()
    }

    /// Own value, or the concatenated values of the subtree
    pub fn value_text(&self, id: NodeId) -> Vec<String> {
        let node = self.node(id);
        if !node.value.is_empty() {
            return node.value.clone();
        }
        node.children
            .iter()
            .flat_map(|child| self.value_text(*child))
            .collect()
    }

    pub fn set_value(&mut self, id: NodeId, value: Vec<String>) {
        self.nodes[id.index()].value = value;
    }

    // =========================================================================
    // Locations
    // =========================================================================

    /// Smallest segment covering the node's descendants. Computed on first
    /// access and cached until the subtree changes.
    pub fn location(&self, id: NodeId) -> Option<SegmentLocation> {
        let node = self.node(id);

        if node.anchor_state.get() == AnchorState::Stale {
            let mut merged: Option<SegmentLocation> = None;
            for child in &node.children {
                if let Some(location) = self.location(*child) {
                    merged = Some(SegmentLocation::merge_into(merged, &location));
                }
            }
            node.anchor.set(merged);
            node.anchor_state.set(AnchorState::Derived);
        }

        node.anchor.get()
    }

    /// Set the location explicitly, as done for tokens and collapsed leaves
    pub fn set_location(&mut self, id: NodeId, location: Option<SegmentLocation>) {
        let node = &self.nodes[id.index()];
        node.anchor.set(location);
        node.anchor_state.set(AnchorState::Explicit);
        self.invalidate_ancestors(id);
    }

    /// Forget the node's location; it is recomputed from children on the
    /// next read
    pub fn reset_location(&mut self, id: NodeId) {
        self.mark_changed(id);
    }

    /// The node's own children changed
    fn mark_changed(&self, id: NodeId) {
        let node = self.node(id);
        node.anchor.set(None);
        node.anchor_state.set(AnchorState::Stale);
        self.invalidate_ancestors(id);
    }

    fn invalidate_ancestors(&self, id: NodeId) {
        for ancestor in self.ancestors(id) {
            let node = self.node(ancestor);
            if node.anchor_state.get() == AnchorState::Derived {
                node.anchor_state.set(AnchorState::Stale);
            }
        }
    }

    // =========================================================================
    // Structural mutation
    // =========================================================================

    /// Remove the node from its parent's children, if attached
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != id);
            self.mark_changed(parent);
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }

    pub fn add_last_child(&mut self, parent: NodeId, child: NodeId) {
        let at = self.children(parent).len();
        self.insert_child(parent, at, child);
    }

    pub fn add_first_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, 0, child);
    }

    /// Insert `child` at position `at`; positions past the end append
    pub fn insert_child(&mut self, parent: NodeId, at: usize, child: NodeId) {
        self.insert_children(parent, at, &[child]);
    }

    pub fn insert_children(&mut self, parent: NodeId, at: usize, children: &[NodeId]) {
        for child in children {
            self.detach(*child);
            self.nodes[child.index()].parent = Some(parent);
        }

        let list = &mut self.nodes[parent.index()].children;
        let at = at.min(list.len());
        list.splice(at..at, children.iter().copied());

        self.mark_changed(parent);
    }

    /// Remove and return the child at position `at`
    pub fn remove_child(&mut self, parent: NodeId, at: usize) -> NodeId {
        let child = self.nodes[parent.index()].children.remove(at);
        self.nodes[child.index()].parent = None;
        self.mark_changed(parent);
        child
    }

    /// Remove children in `range` and return them, in order
    pub fn remove_children(&mut self, parent: NodeId, range: std::ops::Range<usize>) -> Vec<NodeId> {
        let removed: Vec<NodeId> = self.nodes[parent.index()].children.drain(range).collect();
        for child in &removed {
            self.nodes[child.index()].parent = None;
        }
        self.mark_changed(parent);
        removed
    }

    pub fn replace_child(&mut self, parent: NodeId, at: usize, child: NodeId) {
        self.remove_child(parent, at);
        self.insert_child(parent, at, child);
    }

    /// Replace the child at `at` by its own children. Returns how many
    /// nodes took its place.
    pub fn splice_child(&mut self, parent: NodeId, at: usize) -> usize {
        let removed = self.remove_child(parent, at);
        let grandchildren = self.take_children(removed);
        let count = grandchildren.len();
        self.insert_children(parent, at, &grandchildren);
        count
    }

    /// Detach and return all children
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let len = self.children(id).len();
        self.remove_children(id, 0..len)
    }

    /// Drop all children; the node's location is recomputed lazily
    pub fn reset_children(&mut self, id: NodeId) {
        self.take_children(id);
        self.reset_location(id);
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Nodes of the subtree in pre-order
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        result
    }

    /// Childless nodes of the subtree, left to right
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.preorder(id)
            .into_iter()
            .filter(|n| self.is_leaf(*n))
            .collect()
    }

    /// Parent chain, innermost first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Index of `child` among its parent's children
    pub fn index_in_parent(&self, child: NodeId) -> Option<usize> {
        let parent = self.parent(child)?;
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Text dump of a subtree, one node per line
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let _ = write!(out, "{}{}", "  ".repeat(depth), node.node_type());
        if !node.value.is_empty() {
            let _ = write!(out, ": {}", node.value.join(" "));
        }
        out.push('\n');
        for child in &node.children {
            self.dump_into(*child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: usize, end: usize) -> SegmentLocation {
        SegmentLocation::from_offsets(start, end)
    }

    /// root(a(x, y), b)
    fn sample() -> (Tree, [NodeId; 5]) {
        let mut tree = Tree::new();
        let root = tree.new_node("root");
        let a = tree.new_node("a");
        let x = tree.new_leaf("ID", "x", seg(2, 2));
        let y = tree.new_leaf("ID", "y", seg(4, 5));
        let b = tree.new_leaf("ID", "b", seg(8, 9));
        tree.add_last_child(a, x);
        tree.add_last_child(a, y);
        tree.add_last_child(root, a);
        tree.add_last_child(root, b);
        tree.set_root(root);
        (tree, [root, a, x, y, b])
    }

    #[test]
    fn test_location_merges_children() {
        let (tree, [root, a, ..]) = sample();
        assert_eq!(tree.location(a), Some(seg(2, 5)));
        assert_eq!(tree.location(root), Some(seg(2, 9)));
    }

    #[test]
    fn test_mutation_invalidates_ancestors() {
        let (mut tree, [root, a, x, ..]) = sample();
        assert_eq!(tree.location(root), Some(seg(2, 9)));

        let z = tree.new_leaf("ID", "z", seg(0, 0));
        tree.add_first_child(a, z);
        assert_eq!(tree.location(root), Some(seg(0, 9)));

        tree.detach(z);
        tree.detach(x);
        assert_eq!(tree.location(root), Some(seg(4, 9)));
    }

    #[test]
    fn test_node_without_located_children_has_no_location() {
        let mut tree = Tree::new();
        let parent = tree.new_node("p");
        let child = tree.new_node("c");
        tree.add_last_child(parent, child);
        assert_eq!(tree.location(parent), None);
    }

    #[test]
    fn test_reparenting_detaches_first() {
        let (mut tree, [root, a, x, ..]) = sample();
        tree.add_last_child(root, x);

        assert_eq!(tree.parent(x), Some(root));
        assert_eq!(tree.children(a).len(), 1);
        assert_eq!(tree.children(root).len(), 3);
    }

    #[test]
    fn test_splice_child_keeps_order() {
        let (mut tree, [root, ..]) = sample();
        let count = tree.splice_child(root, 0);

        assert_eq!(count, 2);
        assert_eq!(tree.value_text(root), vec!["x", "y", "b"]);
        assert!(tree.children(root).iter().all(|c| tree.parent(*c) == Some(root)));
    }

    #[test]
    fn test_node_type_prefers_alias() {
        let (mut tree, [_, a, ..]) = sample();
        assert_eq!(tree.node_type(a), "a");

        tree.node_mut(a).userified = Some("A".into());
        assert_eq!(tree.node_type(a), "A");

        tree.node_mut(a).alias = Some("pair".into());
        assert_eq!(tree.node_type(a), "pair");
    }

    #[test]
    fn test_options_are_copied_on_write() {
        let (mut tree, [_, a, x, ..]) = sample();
        tree.options_mut(a).set_priority(2.0);

        assert_eq!(tree.options(a).priority(), Some(2.0));
        assert_eq!(tree.options(x).priority(), None);
    }

    #[test]
    fn test_preorder_and_ancestors() {
        let (tree, [root, a, x, y, b]) = sample();
        assert_eq!(tree.preorder(root), vec![root, a, x, y, b]);
        assert_eq!(tree.leaves(root), vec![x, y, b]);
        assert_eq!(tree.ancestors(y).collect::<Vec<_>>(), vec![a, root]);
        assert_eq!(tree.index_in_parent(b), Some(1));
    }
}
