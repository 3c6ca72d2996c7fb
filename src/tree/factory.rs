//! Registry of node constructors keyed by grammar symbol.
//!
//! Front-ends and the custom block inserter never call [`Tree::new_node`]
//! directly; they go through a [`NodeFactory`] so that a language can
//! pre-populate nodes of particular symbols (options, aliases, values).

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::node::{NodeId, Tree};

/// Builds a node of the given symbol in the tree
pub type NodeConstructor = fn(&mut Tree, &str) -> NodeId;

#[derive(Debug, Clone, Default)]
pub struct NodeFactory {
    constructors: FxHashMap<SmolStr, NodeConstructor>,
}

impl NodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, symbol: &str, constructor: NodeConstructor) {
        self.constructors.insert(SmolStr::new(symbol), constructor);
    }

    pub fn with_constructor(mut self, symbol: &str, constructor: NodeConstructor) -> Self {
        self.register(symbol, constructor);
        self
    }

    /// Create a detached node; unregistered symbols get a plain node
    pub fn create(&self, tree: &mut Tree, symbol: &str) -> NodeId {
        match self.constructors.get(symbol) {
            Some(constructor) => constructor(tree, symbol),
            None => tree.new_node(symbol),
        }
    }
}
