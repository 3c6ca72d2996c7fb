use crate::base::SegmentLocation;
use crate::base::constants::ANY;
use crate::tree::node::{NodeId, Tree};
use crate::tree::visitor::{TreeVisitor, walk_children};

/// Merges adjacent `Any` siblings into the first of them
#[derive(Debug, Default)]
pub struct MergeAnyVisitor;

impl TreeVisitor for MergeAnyVisitor {
    fn visit(&mut self, tree: &mut Tree, node: NodeId) {
        let mut i = 1;
        while i < tree.children(node).len() {
            let prev = tree.children(node)[i - 1];
            let cur = tree.children(node)[i];

            let both_any = tree.symbol(prev) == ANY && tree.symbol(cur) == ANY;
            let Some(cur_location) = tree.location(cur).filter(|_| both_any) else {
                i += 1;
                continue;
            };

            let start = tree.location(prev).map_or(cur_location.start, |l| l.start);
            tree.set_location(prev, Some(SegmentLocation::new(start, cur_location.end)));

            let mut value = tree.node(prev).value.clone();
            value.extend(tree.node(cur).value.iter().cloned());
            tree.set_value(prev, value);

            tree.remove_child(node, i);
        }

        walk_children(self, tree, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_any_nodes_merge() {
        let mut tree = Tree::new();
        let root = tree.new_node("root");
        let a = tree.new_leaf(ANY, "int x;", SegmentLocation::from_offsets(0, 5));
        let b = tree.new_leaf(ANY, "int y;", SegmentLocation::from_offsets(7, 12));
        let c = tree.new_leaf(ANY, "z", SegmentLocation::from_offsets(14, 14));
        let id = tree.new_leaf("ID", "w", SegmentLocation::from_offsets(16, 16));
        for child in [a, b, c, id] {
            tree.add_last_child(root, child);
        }
        tree.set_root(root);

        tree.accept(&mut MergeAnyVisitor);

        assert_eq!(tree.children(root), &[a, id]);
        assert_eq!(tree.node(a).value, vec!["int x;", "int y;", "z"]);
        assert_eq!(tree.location(a), Some(SegmentLocation::from_offsets(0, 14)));
    }

    #[test]
    fn test_any_without_location_is_kept() {
        let mut tree = Tree::new();
        let root = tree.new_node("root");
        let a = tree.new_leaf(ANY, "x", SegmentLocation::from_offsets(0, 0));
        let b = tree.new_node(ANY);
        tree.add_last_child(root, a);
        tree.add_last_child(root, b);
        tree.set_root(root);

        tree.accept(&mut MergeAnyVisitor);

        assert_eq!(tree.children(root).len(), 2);
    }
}
