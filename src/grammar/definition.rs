//! The grammar as seen by tree shaping: symbol options, display names and
//! custom block delimiters.
//!
//! Building a grammar from its textual specification and computing parse
//! tables happen elsewhere; this type only carries what the pipeline reads.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::options::{CustomBlockOption, GrammarOption, OptionValue, OptionsManager, ParsingOption};
use crate::base::constants::AUTO_RULE_PREFIX;

/// How custom block delimiters look in the token stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomBlockSettings {
    /// Token carrying the delimiters, usually a comment
    pub base_token: SmolStr,
    pub start_prefix: String,
    pub start_suffix: String,
    pub end_prefix: String,
    pub end_suffix: String,
}

/// Role of a base token lexeme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMarker {
    /// Opens a block with the given name
    Start(String),
    End,
}

impl CustomBlockSettings {
    /// Classify a lexeme of the base token
    pub fn classify(&self, lexeme: &str) -> Option<BlockMarker> {
        let lexeme = lexeme.trim_end();

        if lexeme.starts_with(&self.end_prefix) && lexeme.ends_with(&self.end_suffix) {
            return Some(BlockMarker::End);
        }

        if lexeme.starts_with(&self.start_prefix)
            && lexeme.ends_with(&self.start_suffix)
            && lexeme.len() >= self.start_prefix.len() + self.start_suffix.len()
        {
            let name = &lexeme[self.start_prefix.len()..lexeme.len() - self.start_suffix.len()];
            return Some(BlockMarker::Start(name.trim().to_string()));
        }

        None
    }
}

/// Grammar data consumed by the tree visitors
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub name: String,
    pub options: OptionsManager,
    /// Written form of literal tokens, e.g. `LPAR -> (`
    literals: IndexMap<SmolStr, String>,
}

impl Grammar {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set an option for symbols; see [`OptionsManager::set`]
    pub fn with_option(
        mut self,
        option: impl Into<GrammarOption>,
        symbols: &[&str],
        params: Vec<OptionValue>,
    ) -> Self {
        self.options.set(option, symbols, params);
        self
    }

    /// Register the written form of a literal token
    pub fn with_literal(mut self, token: &str, text: &str) -> Self {
        self.literals.insert(SmolStr::new(token), text.to_string());
        self
    }

    /// Is the option set for the symbol or, when present, the alias?
    pub fn is_set_for(&self, option: impl Into<GrammarOption>, symbol: &str, alias: Option<&str>) -> bool {
        let option = option.into();
        self.options.is_set(option, symbol)
            || alias.is_some_and(|a| !a.is_empty() && self.options.is_set(option, a))
    }

    /// Name of a symbol as a grammar author would write it
    pub fn developerify(&self, symbol: &str) -> String {
        if let Some(text) = self.literals.get(symbol) {
            return format!("'{}'", text);
        }

        symbol
            .strip_prefix(AUTO_RULE_PREFIX)
            .map(|rest| format!("({})", rest))
            .unwrap_or_else(|| symbol.to_string())
    }

    /// Display name: the `userify` parameter if declared, else the
    /// developer form
    pub fn userify(&self, symbol: &str) -> String {
        self.options
            .get_params(ParsingOption::Userify, symbol)
            .first()
            .and_then(OptionValue::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.developerify(symbol))
    }

    /// Custom block delimiters declared through the `customblock` options
    pub fn custom_block_settings(&self) -> Option<CustomBlockSettings> {
        let base_token = self.options.get_symbols(CustomBlockOption::BaseToken).into_iter().next()?;

        let pair = |option: CustomBlockOption| -> (String, String) {
            let params = self.options.get_params(option, "");
            let get = |i: usize| {
                params
                    .get(i)
                    .and_then(OptionValue::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            (get(0), get(1))
        };

        let (start_prefix, start_suffix) = pair(CustomBlockOption::Start);
        let (end_prefix, end_suffix) = pair(CustomBlockOption::End);

        Some(CustomBlockSettings {
            base_token,
            start_prefix,
            start_suffix,
            end_prefix,
            end_suffix,
        })
    }
}
