use crate::base::constants::{ANY, CUSTOM_BLOCK_END, CUSTOM_BLOCK_RULE};
use crate::grammar::{Grammar, MarkupOption, OptionValue};
use crate::tree::node::{NodeId, Tree};
use crate::tree::visitor::{TreeVisitor, walk_children};

/// Copies markup options from the grammar onto every node.
///
/// Priorities already present on a node (written at the occurrence or
/// inherited from a dissolved ghost) are kept. Otherwise the alias
/// priority wins over the symbol priority; `Any` nodes default to zero and
/// everything else to one.
pub struct MarkupOptionsVisitor<'g> {
    grammar: &'g Grammar,
}

impl<'g> MarkupOptionsVisitor<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    fn declared(&self, option: MarkupOption, name: &str) -> bool {
        self.grammar.options.is_set(option, name) || (option == MarkupOption::Land && name == CUSTOM_BLOCK_RULE)
    }

    fn declared_priority(&self, name: &str) -> Option<f64> {
        let declared = self
            .grammar
            .options
            .get_params(MarkupOption::Priority, name)
            .first()
            .and_then(OptionValue::as_f64);

        match declared {
            None if name == CUSTOM_BLOCK_END => Some(0.0),
            other => other,
        }
    }
}

impl TreeVisitor for MarkupOptionsVisitor<'_> {
    fn visit(&mut self, tree: &mut Tree, node: NodeId) {
        let symbol = tree.node(node).symbol.clone();
        let alias = tree.node(node).alias.clone().filter(|a| !a.is_empty());
        let names: Vec<&str> = std::iter::once(symbol.as_str()).chain(alias.as_deref()).collect();
        let any_set = |option| names.iter().any(|n| self.declared(option, n));

        let land = any_set(MarkupOption::Land);
        let exact = any_set(MarkupOption::ExactMatch);
        let not_unique = any_set(MarkupOption::NotUnique);

        let header_core = names
            .iter()
            .map(|n| self.grammar.options.get_params(MarkupOption::HeaderCore, n))
            .find(|params| !params.is_empty())
            .map(<[OptionValue]>::to_vec);

        let priority = match tree.options(node).priority() {
            Some(_) => None,
            None => Some(
                alias
                    .as_deref()
                    .and_then(|a| self.declared_priority(a))
                    .or_else(|| self.declared_priority(&symbol))
                    .unwrap_or(if symbol == ANY { 0.0 } else { 1.0 }),
            ),
        };

        let options = tree.options_mut(node);
        if land {
            options.set(MarkupOption::Land, vec![]);
        }
        if exact {
            options.set(MarkupOption::ExactMatch, vec![]);
        }
        if not_unique {
            options.set(MarkupOption::NotUnique, vec![]);
        }
        if let Some(params) = header_core {
            options.set(MarkupOption::HeaderCore, params);
        }
        if let Some(priority) = priority {
            options.set_priority(priority);
        }

        walk_children(self, tree, node);
    }
}
