//! Visitor over an arena [`Tree`].

use super::node::{NodeId, Tree};

/// A pass over a parse tree.
///
/// The default `visit` just walks the children in pre-order. Passes that
/// restructure a node override `visit`, rewrite the node's own children and
/// then call [`walk_children`].
pub trait TreeVisitor {
    fn visit(&mut self, tree: &mut Tree, node: NodeId) {
        walk_children(self, tree, node);
    }
}

/// Visit every current child of `node`.
///
/// The child list is captured before descending, so a child pass may
/// rewrite its own subtree but must not touch its siblings.
pub fn walk_children<V: TreeVisitor + ?Sized>(visitor: &mut V, tree: &mut Tree, node: NodeId) {
    let children = tree.children(node).to_vec();
    for child in children {
        visitor.visit(tree, child);
    }
}

impl Tree {
    /// Run the visitor from the root, if there is one
    pub fn accept(&mut self, visitor: &mut dyn TreeVisitor) {
        if let Some(root) = self.root() {
            visitor.visit(self, root);
        }
    }
}
