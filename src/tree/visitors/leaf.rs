use super::node_option_set;
use crate::grammar::{Grammar, NodeOption};
use crate::tree::node::{NodeId, Tree};
use crate::tree::visitor::{TreeVisitor, walk_children};

/// Collapses `leaf` nodes: the subtree text becomes the node value and the
/// children are dropped.
pub struct LeafVisitor<'g> {
    grammar: &'g Grammar,
}

impl<'g> LeafVisitor<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }
}

impl TreeVisitor for LeafVisitor<'_> {
    fn visit(&mut self, tree: &mut Tree, node: NodeId) {
        if !node_option_set(self.grammar, tree, node, NodeOption::Leaf) {
            walk_children(self, tree, node);
            return;
        }

        let value = tree.value_text(node);
        let location = tree.location(node);

        tree.set_value(node, value);
        tree.reset_children(node);
        if location.is_some() {
            tree.set_location(node, location);
        }
    }
}
