use smol_str::SmolStr;

use crate::grammar::Grammar;
use crate::tree::node::{NodeId, Tree};
use crate::tree::visitor::{TreeVisitor, walk_children};

/// Assigns display names to every node
pub struct UserifyVisitor<'g> {
    grammar: &'g Grammar,
}

impl<'g> UserifyVisitor<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }
}

impl TreeVisitor for UserifyVisitor<'_> {
    fn visit(&mut self, tree: &mut Tree, node: NodeId) {
        let name = self.grammar.userify(tree.symbol(node));
        tree.node_mut(node).userified = Some(SmolStr::new(name));

        walk_children(self, tree, node);
    }
}
