use tracing::trace;

use super::node_option_set;
use crate::grammar::{Grammar, NodeOption};
use crate::tree::node::{NodeId, Tree};
use crate::tree::visitor::{TreeVisitor, walk_children};

/// Removes `void` nodes, dissolves `ghost` nodes into their parents and
/// flattens `list` nodes.
///
/// A node marked both `ghost` and `list` is treated as ghost; `void` wins
/// over both.
pub struct GhostListVisitor<'g> {
    grammar: &'g Grammar,
}

impl<'g> GhostListVisitor<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Replace the child at `at` by its children, carrying its priority over
    fn dissolve(&self, tree: &mut Tree, node: NodeId, at: usize) {
        let removed = tree.children(node)[at];

        if let Some(priority) = tree.options(removed).priority() {
            for grandchild in tree.children(removed).to_vec() {
                let inherited = tree.options(grandchild).priority_or_default() * priority;
                tree.options_mut(grandchild).set_priority(inherited);
            }
        }

        trace!("dissolving {} under {}", tree.node_type(removed), tree.node_type(node));
        tree.splice_child(node, at);
    }
}

impl TreeVisitor for GhostListVisitor<'_> {
    fn visit(&mut self, tree: &mut Tree, node: NodeId) {
        let mut i = 0;
        while i < tree.children(node).len() {
            let child = tree.children(node)[i];

            if node_option_set(self.grammar, tree, child, NodeOption::Void) {
                tree.remove_child(node, i);
                continue;
            }

            if node_option_set(self.grammar, tree, child, NodeOption::Ghost) {
                // Spliced children are re-checked from the same index
                self.dissolve(tree, node, i);
                continue;
            }

            i += 1;
        }

        if node_option_set(self.grammar, tree, node, NodeOption::List) {
            let data = tree.node(node);
            let symbol = data.symbol.clone();
            let alias = data.alias.clone().filter(|a| !a.is_empty());
            let list_for_symbol = tree.options(node).is_set(NodeOption::List)
                || self.grammar.options.is_set(NodeOption::List, &symbol);
            let list_for_alias = alias
                .as_deref()
                .is_some_and(|a| self.grammar.options.is_set(NodeOption::List, a));

            let mut i = 0;
            while i < tree.children(node).len() {
                let child = tree.node(tree.children(node)[i]);
                let same = list_for_symbol && child.symbol == symbol
                    || list_for_alias && child.alias.is_some() && child.alias == alias;

                if same {
                    self.dissolve(tree, node, i);
                } else {
                    i += 1;
                }
            }
        }

        walk_children(self, tree, node);
    }
}
