//! Tree-shaping passes applied after parsing.
//!
//! Each pass is a [`TreeVisitor`](super::TreeVisitor); [`Pipeline`](super::Pipeline)
//! runs them in a fixed order.

mod ghost_list;
mod leaf;
mod markup_options;
mod merge_any;
mod remove_auto;
mod userify;

pub use ghost_list::GhostListVisitor;
pub use leaf::LeafVisitor;
pub use markup_options::MarkupOptionsVisitor;
pub use merge_any::MergeAnyVisitor;
pub use remove_auto::RemoveAutoVisitor;
pub use userify::UserifyVisitor;

use super::node::{NodeId, Tree};
use crate::grammar::{Grammar, NodeOption, OptionGroup};

/// Is a `nodes` option in effect for `node`?
///
/// Options written at the node's occurrence in a rule win; grammar-level
/// options for the symbol or alias apply only when the occurrence carries
/// no `nodes` options at all.
pub(crate) fn node_option_set(grammar: &Grammar, tree: &Tree, node: NodeId, option: NodeOption) -> bool {
    let local = tree.options(node);
    if local.is_set(option) {
        return true;
    }
    if local.has_group(OptionGroup::Nodes) {
        return false;
    }

    let data = tree.node(node);
    grammar.is_set_for(option, &data.symbol, data.alias.as_deref())
}
