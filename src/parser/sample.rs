//! Recursive descent front-end for a small C-like language.
//!
//! ```text
//! file        : member_list
//! member_list : member member_list | ε            (ghost)
//! member      : class | method | field            (ghost)
//! class       : 'class' ID '{' member_list '}'    (land)
//! method      : type ID '(' params? ')' block     (land)
//! field       : type ID ';'                       (land)
//! params      : param (',' params)?               (list)
//! param       : type ID
//! type        : ID ('.' ID)*                      (leaf)
//! block       : '{' auto__block_body '}'
//! ```
//!
//! Method bodies are not parsed beyond brace nesting: everything between
//! braces becomes `Any`. Custom blocks are delimited by `//#region name`
//! and `//#endregion` comments.
//!
//! The raw tree mirrors rule nesting exactly; [`grammar`] carries the
//! options that shape it.

use super::lexer::{LineIndex, Lexer, Token, TokenKind};
use super::ParsingAlgorithm;
use crate::base::constants::ANY;
use crate::base::{Message, PointLocation};
use crate::grammar::{CustomBlockOption, CustomBlockSettings, Grammar, MarkupOption, NodeOption, OptionValue};
use crate::tree::{CustomBlock, CustomBlockScanner, NodeFactory, NodeId, Tree};

const SOURCE: &str = "SampleParser";

/// Grammar of the sample language
pub fn grammar() -> Grammar {
    let punctuation = ["LBRACE", "RBRACE", "LPAR", "RPAR", "COMMA", "SEMICOLON"];

    Grammar::new("sample")
        .with_option(NodeOption::Ghost, &["member_list", "member"], vec![])
        .with_option(NodeOption::List, &["params"], vec![])
        .with_option(NodeOption::Leaf, &["type"], vec![])
        .with_option(MarkupOption::Land, &["class", "method", "field"], vec![])
        .with_option(
            MarkupOption::HeaderCore,
            &["class", "method", "field"],
            vec![OptionValue::StrList(vec!["ID".to_string()])],
        )
        .with_option(MarkupOption::Priority, &punctuation, vec![OptionValue::Double(0.0)])
        .with_option(CustomBlockOption::BaseToken, &["COMMENT"], vec![])
        .with_option(CustomBlockOption::Start, &[], vec!["//#region".into(), "".into()])
        .with_option(CustomBlockOption::End, &[], vec!["//#endregion".into(), "".into()])
        .with_literal("CLASS", "class")
        .with_literal("LBRACE", "{")
        .with_literal("RBRACE", "}")
        .with_literal("LPAR", "(")
        .with_literal("RPAR", ")")
        .with_literal("COMMA", ",")
        .with_literal("SEMICOLON", ";")
}

/// Parsing algorithm for the sample language
#[derive(Debug, Clone, Default)]
pub struct SampleParser {
    custom_blocks: Option<CustomBlockSettings>,
}

impl SampleParser {
    pub fn new(grammar: &Grammar) -> Self {
        Self {
            custom_blocks: grammar.custom_block_settings(),
        }
    }
}

impl ParsingAlgorithm for SampleParser {
    fn parse(&mut self, text: &str, factory: &NodeFactory, log: &mut Vec<Message>) -> (Option<Tree>, Vec<CustomBlock>) {
        let index = LineIndex::new(text);
        let mut tree = Tree::new();
        let mut scanner = self
            .custom_blocks
            .clone()
            .map(|settings| CustomBlockScanner::new(settings, factory));

        let mut tokens = Vec::new();
        for token in Lexer::new(text) {
            match token.kind {
                TokenKind::Error => {
                    log.push(Message::error(
                        SOURCE,
                        format!("Unexpected character '{}'", token.text),
                        Some(index.point(token.offset)),
                    ));
                }
                kind if kind.is_trivia() => {
                    if let Some(scanner) = scanner.as_mut() {
                        if scanner.base_token() == kind.symbol() {
                            scanner.scan(&mut tree, token.text, index.segment(&token), log);
                        }
                    }
                }
                _ => tokens.push(token),
            }
        }

        let eof = index.point(text.len());
        let blocks = scanner.map(|s| s.finish(eof, log)).unwrap_or_default();

        let mut parser = RawTreeBuilder {
            tokens: &tokens,
            pos: 0,
            tree: &mut tree,
            factory,
            index: &index,
            log,
            eof,
        };
        let root = parser.file();
        tree.set_root(root);

        (Some(tree), blocks)
    }
}

/// The parser state
struct RawTreeBuilder<'a, 't> {
    tokens: &'a [Token<'t>],
    pos: usize,
    tree: &'a mut Tree,
    factory: &'a NodeFactory,
    index: &'a LineIndex,
    log: &'a mut Vec<Message>,
    eof: PointLocation,
}

impl RawTreeBuilder<'_, '_> {
    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&Token<'_>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn nth(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn node(&mut self, symbol: &str) -> NodeId {
        self.factory.create(self.tree, symbol)
    }

    /// Add the current token to `parent` as a leaf of the given symbol
    fn bump_as(&mut self, parent: NodeId, symbol: &str) {
        let tokens = self.tokens;
        let Some(token) = tokens.get(self.pos) else {
            return;
        };
        let location = self.index.segment(token);
        let leaf = self.node(symbol);
        self.tree.set_value(leaf, vec![token.text.to_string()]);
        self.tree.set_location(leaf, Some(location));
        self.tree.add_last_child(parent, leaf);
        self.pos += 1;
    }

    fn bump(&mut self, parent: NodeId) {
        if let Some(kind) = self.current_kind() {
            self.bump_as(parent, kind.symbol());
        }
    }

    fn expect(&mut self, parent: NodeId, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump(parent);
            true
        } else {
            self.error(format!("expected {}", kind.symbol()));
            false
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let location = match self.current() {
            Some(token) => self.index.point(token.offset),
            None => self.eof,
        };
        self.log.push(Message::error(SOURCE, message, Some(location)));
    }

    /// Skip tokens up to one of `recovery`, consuming at least one
    fn error_recover(&mut self, message: impl Into<String>, recovery: &[TokenKind]) {
        self.error(message);
        let mut consumed = false;
        while let Some(kind) = self.current_kind() {
            if consumed && recovery.contains(&kind) {
                break;
            }
            self.pos += 1;
            consumed = true;
            if kind == TokenKind::Semicolon {
                break;
            }
        }
    }

    // =========================================================================
    // Rules
    // =========================================================================

    fn file(&mut self) -> NodeId {
        let file = self.node("file");
        let members = self.member_list(false);
        self.tree.add_last_child(file, members);
        file
    }

    /// Right-recursive like the grammar; built iteratively
    fn member_list(&mut self, in_class: bool) -> NodeId {
        let head = self.node("member_list");
        let mut tail = head;

        loop {
            if self.at_eof() || (in_class && self.at(TokenKind::RBrace)) {
                break;
            }

            let Some(member) = self.member() else {
                continue;
            };
            self.tree.add_last_child(tail, member);

            let next = self.node("member_list");
            self.tree.add_last_child(tail, next);
            tail = next;
        }

        head
    }

    fn member(&mut self) -> Option<NodeId> {
        let inner = match (self.current_kind(), self.nth(1), self.nth(2)) {
            (Some(TokenKind::Class), _, _) => self.class(),
            (Some(TokenKind::Ident), Some(TokenKind::Ident | TokenKind::Punct), _) => self.typed_member(),
            _ => {
                self.error_recover("expected class, method or field", &[TokenKind::Class, TokenKind::Ident]);
                return None;
            }
        };

        let member = self.node("member");
        self.tree.add_last_child(member, inner);
        Some(member)
    }

    fn class(&mut self) -> NodeId {
        let class = self.node("class");
        self.bump(class);
        self.expect(class, TokenKind::Ident);

        if self.expect(class, TokenKind::LBrace) {
            let members = self.member_list(true);
            self.tree.add_last_child(class, members);
            self.expect(class, TokenKind::RBrace);
        }

        class
    }

    /// Method or field, told apart after the name
    fn typed_member(&mut self) -> NodeId {
        let ty = self.ty();

        if !self.at(TokenKind::Ident) {
            let field = self.node("field");
            self.tree.add_last_child(field, ty);
            self.error_recover("expected member name", &[TokenKind::Class, TokenKind::Ident]);
            return field;
        }

        let is_method = self.nth(1) == Some(TokenKind::LParen);
        let member = self.node(if is_method { "method" } else { "field" });
        self.tree.add_last_child(member, ty);
        self.bump(member);

        if !is_method {
            if !self.expect(member, TokenKind::Semicolon) {
                self.error_recover("skipping to the end of the declaration", &[TokenKind::Semicolon]);
            }
            return member;
        }

        self.bump(member);
        if !self.at(TokenKind::RParen) {
            let params = self.params();
            self.tree.add_last_child(member, params);
        }
        self.expect(member, TokenKind::RParen);

        if self.at(TokenKind::LBrace) {
            let body = self.block();
            self.tree.add_last_child(member, body);
        } else {
            self.error("expected method body");
        }

        member
    }

    fn params(&mut self) -> NodeId {
        let params = self.node("params");

        let param = self.node("param");
        let ty = self.ty();
        self.tree.add_last_child(param, ty);
        self.expect(param, TokenKind::Ident);
        self.tree.add_last_child(params, param);

        if self.at(TokenKind::Comma) {
            self.bump(params);
            let rest = self.params();
            self.tree.add_last_child(params, rest);
        }

        params
    }

    fn ty(&mut self) -> NodeId {
        let ty = self.node("type");
        self.expect(ty, TokenKind::Ident);

        while self.current().is_some_and(|t| t.text == ".") && self.nth(1) == Some(TokenKind::Ident) {
            self.bump(ty);
            self.bump(ty);
        }

        ty
    }

    fn block(&mut self) -> NodeId {
        let block = self.node("block");
        self.bump(block);

        let body = self.node("auto__block_body");
        while let Some(kind) = self.current_kind() {
            match kind {
                TokenKind::RBrace => break,
                TokenKind::LBrace => {
                    let nested = self.block();
                    self.tree.add_last_child(body, nested);
                }
                _ => self.bump_as(body, ANY),
            }
        }
        self.tree.add_last_child(block, body);

        self.expect(block, TokenKind::RBrace);
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str) -> (Tree, Vec<CustomBlock>, Vec<Message>) {
        let grammar = grammar();
        let factory = NodeFactory::new();
        let mut log = Vec::new();
        let (tree, blocks) = SampleParser::new(&grammar).parse(text, &factory, &mut log);
        (tree.expect("tree"), blocks, log)
    }

    #[test]
    fn test_raw_tree_mirrors_rules() {
        let (tree, blocks, log) = raw("int Foo(int x) { return x; }");
        assert!(log.is_empty(), "{:?}", log);
        assert!(blocks.is_empty());

        let dump = tree.dump(tree.root().expect("root"));
        assert!(dump.starts_with("file\n  member_list\n    member\n      method\n"));
        assert!(dump.contains("auto__block_body"));
        assert!(dump.contains("Any: return"));
    }

    #[test]
    fn test_markers_become_blocks() {
        let (_, blocks, log) = raw("//#region api\nint x;\n//#endregion\n");
        assert!(log.is_empty());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "api");
    }

    #[test]
    fn test_errors_are_logged_and_parsing_continues() {
        let (tree, _, log) = raw("int ; class A { int y; }");
        assert!(!log.is_empty());
        let root = tree.root().expect("root");
        assert!(tree.preorder(root).iter().any(|n| tree.symbol(*n) == "class"));
    }
}
