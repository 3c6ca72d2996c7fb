//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use land::markup::{MarkupManager, MarkupSettings};
use land::parser::{ParsedFile, Parser};
use land::tree::{NodeId, Tree};

pub const NESTED_CLASSES: &str = r#"
class Outer {
    int count;
    class Inner {
        int getValue() { return count; }
    }
}
"#;

pub const TWO_METHODS_IN_CLASS: &str = "class C { int Foo(){} int Bar(){} }";

/// Parse with the sample parser, failing the test on errors
pub fn parse(name: &str, text: &str) -> ParsedFile {
    let file = Parser::sample().parse(name, text);
    assert!(!file.has_errors(), "{:?}", file.log);
    file
}

pub fn tree(file: &ParsedFile) -> &Tree {
    file.tree.as_ref().expect("parsed file has a tree")
}

/// All nodes of the given type, in document order
pub fn nodes_of_type(file: &ParsedFile, node_type: &str) -> Vec<NodeId> {
    let tree = tree(file);
    tree.preorder(tree.root().expect("root"))
        .into_iter()
        .filter(|n| tree.node_type(*n) == node_type)
        .collect()
}

/// The node of the given type whose `ID` child reads `name`
pub fn named(file: &ParsedFile, node_type: &str, name: &str) -> NodeId {
    let tree = tree(file);
    nodes_of_type(file, node_type)
        .into_iter()
        .find(|n| {
            tree.children(*n)
                .iter()
                .any(|c| tree.symbol(*c) == "ID" && tree.node(*c).value == [name])
        })
        .unwrap_or_else(|| panic!("no {} named {}", node_type, name))
}

/// Manager that scores on the calling thread
pub fn manager() -> MarkupManager {
    MarkupManager::with_settings(MarkupSettings::default().with_parallel(false))
}
