//! User-delimited custom blocks.
//!
//! Blocks are opened and closed by marker lexemes of a designated token
//! (usually a comment). The [`CustomBlockScanner`] pairs markers while the
//! text is lexed; the [`CustomBlockInserter`] later splices a
//! `custom_block` node for every block into the shaped tree.
//!
//! A block that cuts through several tree nodes cannot be placed. It is
//! reported as a warning and its nested blocks are retried on their own.

use tracing::warn;

use super::factory::NodeFactory;
use super::node::{NodeId, Tree};
use crate::base::constants::{ANY, CUSTOM_BLOCK_END, CUSTOM_BLOCK_RULE, CUSTOM_BLOCK_START};
use crate::base::{Message, PointLocation, SegmentLocation};
use crate::grammar::{BlockMarker, CustomBlockSettings};

const SOURCE: &str = "CustomBlocks";

/// A matched pair of block markers
#[derive(Debug, Clone)]
pub struct CustomBlock {
    pub name: String,
    /// `CUSTOM_BLOCK_START` node carrying the block name
    pub start: NodeId,
    /// `CUSTOM_BLOCK_END` node
    pub end: NodeId,
    /// From the first character of the start marker to the last one of
    /// the end marker
    pub location: SegmentLocation,
    /// Blocks nested directly inside this one, in document order
    pub children: Vec<CustomBlock>,
}

impl CustomBlock {
    /// All blocks of the forest in post-order
    pub fn flatten(blocks: &[CustomBlock]) -> Vec<&CustomBlock> {
        let mut result = Vec::new();
        for block in blocks {
            result.extend(Self::flatten(&block.children));
            result.push(block);
        }
        result
    }
}

// ============================================================================
// Scanning
// ============================================================================

#[derive(Debug)]
struct OpenBlock {
    name: String,
    start: NodeId,
    location: SegmentLocation,
    children: Vec<CustomBlock>,
}

/// Pairs start and end markers into a forest of blocks
#[derive(Debug)]
pub struct CustomBlockScanner<'f> {
    settings: CustomBlockSettings,
    factory: &'f NodeFactory,
    open: Vec<OpenBlock>,
    closed: Vec<CustomBlock>,
}

impl<'f> CustomBlockScanner<'f> {
    pub fn new(settings: CustomBlockSettings, factory: &'f NodeFactory) -> Self {
        Self {
            settings,
            factory,
            open: Vec::new(),
            closed: Vec::new(),
        }
    }

    /// Symbol of the token whose lexemes may be markers
    pub fn base_token(&self) -> &str {
        &self.settings.base_token
    }

    /// Feed a lexeme of the base token. Returns `true` if it was a
    /// marker; marker lexemes must not reach the parsing algorithm.
    pub fn scan(&mut self, tree: &mut Tree, lexeme: &str, location: SegmentLocation, log: &mut Vec<Message>) -> bool {
        match self.settings.classify(lexeme) {
            Some(BlockMarker::Start(name)) => {
                let start = self.factory.create(tree, CUSTOM_BLOCK_START);
                tree.set_value(start, vec![name.clone()]);
                tree.set_location(start, Some(location));

                self.open.push(OpenBlock {
                    name,
                    start,
                    location,
                    children: Vec::new(),
                });
                true
            }
            Some(BlockMarker::End) => {
                let Some(open) = self.open.pop() else {
                    log.push(Message::error(
                        SOURCE,
                        "Custom block end marker has no matching start marker",
                        Some(location.start),
                    ));
                    return true;
                };

                let end = self.factory.create(tree, CUSTOM_BLOCK_END);
                tree.set_location(end, Some(location));

                let block = CustomBlock {
                    name: open.name,
                    start: open.start,
                    end,
                    location: SegmentLocation::new(open.location.start, location.end),
                    children: open.children,
                };

                match self.open.last_mut() {
                    Some(parent) => parent.children.push(block),
                    None => self.closed.push(block),
                }
                true
            }
            None => false,
        }
    }

    /// Finish scanning; blocks still open are reported at `eof`
    pub fn finish(self, eof: PointLocation, log: &mut Vec<Message>) -> Vec<CustomBlock> {
        for open in &self.open {
            log.push(Message::error(
                SOURCE,
                format!("Custom block \"{}\" is never closed", open.name),
                Some(eof),
            ));
        }
        self.closed
    }
}

// ============================================================================
// Insertion
// ============================================================================

/// Splices `custom_block` nodes into a shaped tree
#[derive(Debug)]
pub struct CustomBlockInserter<'f> {
    factory: &'f NodeFactory,
    bad_blocks: Vec<CustomBlock>,
}

impl<'f> CustomBlockInserter<'f> {
    pub fn new(factory: &'f NodeFactory) -> Self {
        Self {
            factory,
            bad_blocks: Vec::new(),
        }
    }

    /// Blocks that could not be placed; their nested blocks are not
    /// included here unless they failed too
    pub fn bad_blocks(&self) -> &[CustomBlock] {
        &self.bad_blocks
    }

    /// One warning per bad block
    pub fn report(&self) -> Vec<Message> {
        self.bad_blocks
            .iter()
            .map(|block| {
                Message::warning(
                    SOURCE,
                    format!(
                        "Custom block \"{}\" cuts through several program entities or lies in an area not covered by parsing",
                        block.name
                    ),
                    Some(block.location.start),
                )
            })
            .collect()
    }

    /// Insert top-level `blocks` into the tree. The tree root changes if a
    /// block encloses the whole tree.
    pub fn insert(&mut self, tree: &mut Tree, mut blocks: Vec<CustomBlock>) {
        let Some(target) = tree.root() else {
            self.bad_blocks.extend(blocks);
            return;
        };

        if let Some(root_location) = tree.location(target) {
            while let Some(pos) = blocks.iter().position(|b| b.location.includes(&root_location)) {
                let block = blocks.remove(pos);
                let wrapper = self.wrap(tree, &block);

                // Wrappers stack up around the original root, innermost last
                match tree.parent(target) {
                    Some(parent) => tree.replace_child(parent, 1, wrapper),
                    None => tree.set_root(wrapper),
                }
                tree.insert_child(wrapper, 1, target);

                blocks.splice(pos..pos, block.children);
            }
        }

        self.visit(tree, target, blocks);
    }

    fn wrap(&self, tree: &mut Tree, block: &CustomBlock) -> NodeId {
        let node = self.factory.create(tree, CUSTOM_BLOCK_RULE);
        tree.add_last_child(node, block.start);
        tree.add_last_child(node, block.end);
        node
    }

    /// Try to place a block among the children of `node`. Gives the block
    /// back if some child cuts through it or encloses it.
    fn place(&self, tree: &mut Tree, node: NodeId, block: CustomBlock) -> Result<Vec<CustomBlock>, CustomBlock> {
        let children = tree.children(node).to_vec();
        let locations: Vec<Option<SegmentLocation>> = children.iter().map(|c| tree.location(*c)).collect();

        let blocked = locations.iter().flatten().any(|l| {
            l.overlaps(&block.location) || (l.includes(&block.location) && *l != block.location)
        });
        if blocked {
            return Err(block);
        }

        let included: Vec<usize> = locations
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_some_and(|l| block.location.includes(&l)))
            .map(|(i, _)| i)
            .collect();

        let wrapper = self.wrap(tree, &block);

        match (included.first(), included.last()) {
            (Some(&first), Some(&last)) => {
                let moved = tree.remove_children(node, first..last + 1);
                tree.insert_children(wrapper, 1, &moved);
                tree.insert_child(node, first, wrapper);
            }
            _ => {
                let at = locations
                    .iter()
                    .position(|l| l.is_some_and(|l| l.start.offset > block.location.end.offset))
                    .unwrap_or(children.len());
                tree.insert_child(node, at, wrapper);
            }
        }

        Ok(block.children)
    }

    fn visit(&mut self, tree: &mut Tree, node: NodeId, mut blocks: Vec<CustomBlock>) {
        while !blocks.is_empty() {
            let mut pending = Vec::with_capacity(blocks.len());
            for block in std::mem::take(&mut blocks) {
                match self.place(tree, node, block) {
                    Ok(nested) => pending.extend(nested),
                    Err(block) => pending.push(block),
                }
            }
            blocks = pending;

            let located: Vec<(NodeId, SegmentLocation)> = tree
                .children(node)
                .iter()
                .filter_map(|c| tree.location(*c).map(|l| (*c, l)))
                .collect();

            for (i, (child, location)) in located.iter().enumerate() {
                let touches = |block: &CustomBlock, j: usize| {
                    let other = &located[j].1;
                    block.location.overlaps(other) || block.location.includes(other)
                };

                let (inner, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut blocks).into_iter().partition(|b| {
                    let only_this = location.overlaps(&b.location)
                        && (i + 1 == located.len() || !touches(b, i + 1))
                        && (i == 0 || !touches(b, i - 1));
                    only_this || (location.includes(&b.location) && *location != b.location)
                });
                blocks = rest;

                if !inner.is_empty() {
                    self.visit(tree, *child, inner);
                }
            }

            // Whatever is left cuts through several children
            let mut retry = Vec::new();
            for mut block in blocks.drain(..) {
                warn!("custom block at {} cannot be placed", block.location);
                retry.append(&mut block.children);
                self.bad_blocks.push(block);
            }
            blocks = retry;
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Tells whether a block over a given segment could be placed in a tree
pub struct CustomBlockValidator;

impl CustomBlockValidator {
    pub fn is_valid(tree: &Tree, root: NodeId, block: &SegmentLocation) -> bool {
        let encloses_root = tree.location(root).is_some_and(|l| block.includes(&l));
        if encloses_root || tree.symbol(root) == ANY {
            return true;
        }
        Self::visit_inner(tree, root, block)
    }

    fn visit_inner(tree: &Tree, node: NodeId, block: &SegmentLocation) -> bool {
        let mut included = Vec::new();
        let mut overlapped = Vec::new();
        let mut outer = Vec::new();

        for &child in tree.children(node) {
            let Some(location) = tree.location(child) else {
                continue;
            };
            if block.includes(&location) {
                included.push((child, location));
            }
            if block.overlaps(&location) {
                overlapped.push(child);
            }
            if location.includes(block) && location != *block {
                outer.push(child);
            }
        }

        let is_bare_any = |n: NodeId| tree.symbol(n) == ANY && tree.is_leaf(n);

        if let &[single] = outer.as_slice() {
            return is_bare_any(single) || Self::visit_inner(tree, single, block);
        }

        if let ([single], true) = (&overlapped[..], included.is_empty()) {
            if is_bare_any(*single) {
                return true;
            }
            // One custom block may not cut through another
            return !tree.node(*single).is_custom_block() && Self::visit_inner(tree, *single, block);
        }

        if overlapped.is_empty() {
            if included.is_empty() || !tree.node(node).is_custom_block() {
                return true;
            }

            // Included nodes must not share a line with the block markers
            let Some(bounds) = tree.location(node) else {
                return true;
            };
            let same_line = |a: &PointLocation, b: &PointLocation| a.line.is_some() && a.line == b.line;
            return !included
                .iter()
                .any(|(_, l)| same_line(&l.start, &bounds.start) || same_line(&l.start, &bounds.end));
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: usize, end: usize) -> SegmentLocation {
        SegmentLocation::from_offsets(start, end)
    }

    /// Build a block with marker nodes at the ends of `location`
    fn block(tree: &mut Tree, name: &str, start: (usize, usize), end: (usize, usize)) -> CustomBlock {
        let start_node = tree.new_leaf(CUSTOM_BLOCK_START, name, seg(start.0, start.1));
        let end_node = tree.new_leaf(CUSTOM_BLOCK_END, "", seg(end.0, end.1));
        CustomBlock {
            name: name.to_string(),
            start: start_node,
            end: end_node,
            location: seg(start.0, end.1),
            children: Vec::new(),
        }
    }

    /// root(a[10..19], b[30..39], c[50..59])
    fn flat_tree() -> (Tree, NodeId, [NodeId; 3]) {
        let mut tree = Tree::new();
        let root = tree.new_node("file");
        let a = tree.new_leaf("ID", "a", seg(10, 19));
        let b = tree.new_leaf("ID", "b", seg(30, 39));
        let c = tree.new_leaf("ID", "c", seg(50, 59));
        for child in [a, b, c] {
            tree.add_last_child(root, child);
        }
        tree.set_root(root);
        (tree, root, [a, b, c])
    }

    #[test]
    fn test_block_wraps_included_children() {
        let (mut tree, root, [a, b, c]) = flat_tree();
        let blk = block(&mut tree, "ab", (0, 5), (22, 25));
        let factory = NodeFactory::new();

        let mut inserter = CustomBlockInserter::new(&factory);
        inserter.insert(&mut tree, vec![blk]);

        let children = tree.children(root).to_vec();
        assert_eq!(children.len(), 2);
        assert!(tree.node(children[0]).is_custom_block());
        assert_eq!(&tree.children(children[0])[1..3], &[a, b]);
        assert_eq!(children[1], c);
        assert!(inserter.bad_blocks().is_empty());
    }

    #[test]
    fn test_block_between_children_is_inserted_in_order() {
        let (mut tree, root, [a, b, c]) = flat_tree();
        let blk = block(&mut tree, "empty", (41, 42), (44, 45));
        let factory = NodeFactory::new();

        CustomBlockInserter::new(&factory).insert(&mut tree, vec![blk]);

        let children = tree.children(root);
        assert_eq!(children.len(), 4);
        assert_eq!(&children[..2], &[a, b]);
        assert!(tree.node(children[2]).is_custom_block());
        assert_eq!(children[3], c);
    }

    #[test]
    fn test_block_enclosing_root_becomes_root() {
        let (mut tree, root, _) = flat_tree();
        let blk = block(&mut tree, "all", (0, 5), (60, 65));
        let factory = NodeFactory::new();

        CustomBlockInserter::new(&factory).insert(&mut tree, vec![blk]);

        let new_root = tree.root().expect("root");
        assert!(tree.node(new_root).is_custom_block());
        assert_eq!(tree.children(new_root)[1], root);
        assert_eq!(tree.location(new_root), Some(seg(0, 65)));
    }

    #[test]
    fn test_cutting_block_is_bad_and_nested_block_retried() {
        let (mut tree, root, _) = flat_tree();
        let mut outer = block(&mut tree, "outer", (15, 16), (33, 34));
        let inner = block(&mut tree, "inner", (40, 41), (45, 46));
        outer.children.push(inner);
        outer.location = seg(15, 46);
        let factory = NodeFactory::new();

        let mut inserter = CustomBlockInserter::new(&factory);
        inserter.insert(&mut tree, vec![outer]);

        assert_eq!(inserter.bad_blocks().len(), 1);
        assert_eq!(inserter.bad_blocks()[0].name, "outer");
        assert_eq!(inserter.report().len(), 1);
        assert!(tree.children(root).iter().any(|c| tree.node(*c).is_custom_block()));
    }

    #[test]
    fn test_leaf_locations_unchanged_by_insertion() {
        let (mut tree, root, leaves) = flat_tree();
        let before: Vec<_> = leaves.iter().map(|l| tree.location(*l)).collect();
        let blk = block(&mut tree, "b", (28, 29), (40, 41));
        let factory = NodeFactory::new();

        CustomBlockInserter::new(&factory).insert(&mut tree, vec![blk]);

        let after: Vec<_> = leaves.iter().map(|l| tree.location(*l)).collect();
        assert_eq!(before, after);
        assert_eq!(tree.location(root), Some(seg(10, 59)));
    }

    #[test]
    fn test_scanner_pairs_nested_markers() {
        let settings = CustomBlockSettings {
            base_token: "COMMENT".into(),
            start_prefix: "//#region".into(),
            start_suffix: String::new(),
            end_prefix: "//#endregion".into(),
            end_suffix: String::new(),
        };
        let factory = NodeFactory::new();
        let mut tree = Tree::new();
        let mut log = Vec::new();
        let mut scanner = CustomBlockScanner::new(settings, &factory);

        assert!(scanner.scan(&mut tree, "//#region outer", seg(0, 14), &mut log));
        assert!(scanner.scan(&mut tree, "//#region inner", seg(20, 34), &mut log));
        assert!(!scanner.scan(&mut tree, "// note", seg(40, 46), &mut log));
        assert!(scanner.scan(&mut tree, "//#endregion", seg(50, 61), &mut log));
        assert!(scanner.scan(&mut tree, "//#endregion", seg(70, 81), &mut log));
        assert!(scanner.scan(&mut tree, "//#endregion", seg(90, 101), &mut log));

        let blocks = scanner.finish(PointLocation::at_offset(102), &mut log);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "outer");
        assert_eq!(blocks[0].location, seg(0, 81));
        assert_eq!(blocks[0].children[0].name, "inner");
        assert_eq!(tree.node(blocks[0].start).value, vec!["outer"]);
        assert_eq!(log.len(), 1);
        assert!(log[0].kind.is_error());
    }

    #[test]
    fn test_validator() {
        let (tree, root, _) = flat_tree();

        assert!(CustomBlockValidator::is_valid(&tree, root, &seg(0, 25)));
        assert!(CustomBlockValidator::is_valid(&tree, root, &seg(40, 45)));
        assert!(CustomBlockValidator::is_valid(&tree, root, &seg(0, 70)));
        assert!(!CustomBlockValidator::is_valid(&tree, root, &seg(15, 35)));
    }
}
