use crate::base::constants::AUTO_RULE_PREFIX;
use crate::tree::node::{NodeId, Tree};
use crate::tree::visitor::{TreeVisitor, walk_children};

/// Splices out helper nodes generated for grammar sugar (`auto__*` rules).
///
/// If the last child is such a node and carries an alias, the parent
/// takes the alias over.
#[derive(Debug, Default)]
pub struct RemoveAutoVisitor;

impl TreeVisitor for RemoveAutoVisitor {
    fn visit(&mut self, tree: &mut Tree, node: NodeId) {
        let mut i = 0;
        while i < tree.children(node).len() {
            let child = tree.children(node)[i];

            if !tree.symbol(child).starts_with(AUTO_RULE_PREFIX) {
                i += 1;
                continue;
            }

            let is_last = i + 1 == tree.children(node).len();
            if is_last {
                if let Some(alias) = tree.node(child).alias.clone().filter(|a| !a.is_empty()) {
                    tree.node_mut(node).alias = Some(alias);
                }
            }

            // Spliced children are re-checked from the same index
            tree.splice_child(node, i);
        }

        walk_children(self, tree, node);
    }
}
