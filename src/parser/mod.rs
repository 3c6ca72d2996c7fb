//! Parsing front-ends and the driver around them.
//!
//! ## Architecture
//!
//! ```text
//! Source Text
//!     ↓
//! Preprocessor (optional) → rewritten text
//!     ↓
//! ParsingAlgorithm → raw Tree + custom blocks
//!     ↓
//! Pipeline → shaped Tree (ghosts, leaves, Any, custom blocks, markup options)
//!     ↓
//! Preprocessor postprocess → locations in the original text
//!     ↓
//! ParsedFile
//! ```
//!
//! Building parse tables from a grammar description is not part of this
//! crate; algorithms are supplied by the caller. [`sample`] holds a
//! hand-written one for a small C-like language.

mod lexer;
pub mod sample;

pub use lexer::{LineIndex, Lexer, Token, TokenKind, tokenize};

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::base::{Message, has_errors};
use crate::grammar::Grammar;
use crate::tree::{CustomBlock, NodeFactory, Pipeline, Preprocessor, Tree};

/// A parsing algorithm producing a raw tree.
///
/// Syntax errors go to `log`; the tree may still be returned if the
/// algorithm recovered. Custom block markers found while lexing are
/// returned as a forest of top-level blocks.
pub trait ParsingAlgorithm {
    fn parse(&mut self, text: &str, factory: &NodeFactory, log: &mut Vec<Message>) -> (Option<Tree>, Vec<CustomBlock>);
}

/// A parsed source file
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    /// Path or name the file is known by
    pub name: String,
    /// Text as read, before preprocessing
    pub text: String,
    pub tree: Option<Tree>,
    pub log: Vec<Message>,
}

impl ParsedFile {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.log)
    }

    /// File name without directories
    pub fn base_name(&self) -> &str {
        std::path::Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }
}

/// Figures of the last parse
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Statistics {
    pub time_spent: Duration,
    pub chars_count: usize,
    /// Nodes allocated, including the ones dropped by shaping
    pub nodes_count: usize,
}

/// A parse that produced no usable tree
#[derive(Debug, Error)]
#[error("failed to parse {file}: {}", first_error(.log))]
pub struct ParseFailure {
    pub file: String,
    pub log: Vec<Message>,
}

fn first_error(log: &[Message]) -> String {
    log.iter()
        .find(|m| m.kind.is_error())
        .map(|m| m.to_string())
        .unwrap_or_else(|| "no tree produced".to_string())
}

/// Runs preprocessing, a parsing algorithm and tree shaping
pub struct Parser {
    grammar: Grammar,
    factory: NodeFactory,
    algorithm: Box<dyn ParsingAlgorithm>,
    preprocessor: Option<Box<dyn Preprocessor>>,
    statistics: Statistics,
}

impl Parser {
    pub fn new(grammar: Grammar, algorithm: impl ParsingAlgorithm + 'static) -> Self {
        Self {
            grammar,
            factory: NodeFactory::new(),
            algorithm: Box::new(algorithm),
            preprocessor: None,
            statistics: Statistics::default(),
        }
    }

    /// Parser for the built-in sample language
    pub fn sample() -> Self {
        let grammar = sample::grammar();
        let algorithm = sample::SampleParser::new(&grammar);
        Self::new(grammar, algorithm)
    }

    pub fn with_factory(mut self, factory: NodeFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: impl Preprocessor + 'static) -> Self {
        self.preprocessor = Some(Box::new(preprocessor));
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Parse a file. Problems are reported in the returned log.
    pub fn parse(&mut self, name: &str, text: &str) -> ParsedFile {
        let started = Instant::now();
        let mut log = Vec::new();

        let Self {
            grammar,
            factory,
            algorithm,
            preprocessor,
            ..
        } = self;
        let mut run = |text: &str, log: &mut Vec<Message>| -> Option<Tree> {
            let (tree, blocks) = algorithm.parse(text, factory, log);
            let mut tree = tree?;
            Pipeline::new(grammar, factory).run(&mut tree, blocks, log);
            Some(tree)
        };

        let mut tree = match preprocessor.as_mut() {
            Some(preprocessor) => {
                let preprocessed = preprocessor.preprocess(text);
                log.extend(preprocessed.log);

                if preprocessed.success {
                    run(&preprocessed.text, &mut log).map(|mut tree| {
                        preprocessor.postprocess(&mut tree, &mut log);
                        tree
                    })
                } else {
                    None
                }
            }
            None => run(text, &mut log),
        };

        let log: Vec<Message> = log.into_iter().map(|m| m.with_file_name(name)).collect();

        self.statistics = Statistics {
            time_spent: started.elapsed(),
            chars_count: text.len(),
            nodes_count: tree.as_ref().map_or(0, Tree::len),
        };
        debug!(
            "parsed {} in {:?}: {} nodes, {} messages",
            name,
            self.statistics.time_spent,
            self.statistics.nodes_count,
            log.len()
        );

        if tree.as_ref().is_some_and(|t| t.root().is_none()) {
            tree = None;
        }

        ParsedFile {
            name: name.to_string(),
            text: text.to_string(),
            tree,
            log,
        }
    }

    /// Parse a file, failing if no tree was produced or errors were logged
    pub fn parse_strict(&mut self, name: &str, text: &str) -> Result<ParsedFile, ParseFailure> {
        let file = self.parse(name, text);
        if file.tree.is_none() || file.has_errors() {
            return Err(ParseFailure {
                file: file.name,
                log: file.log,
            });
        }
        Ok(file)
    }
}
