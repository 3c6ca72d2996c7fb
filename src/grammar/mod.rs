//! Grammar model: per-symbol options and the data tree shaping reads from
//! a grammar.

mod definition;
mod options;

pub use definition::{BlockMarker, CustomBlockSettings, Grammar};
pub use options::{
    CustomBlockOption, GrammarOption, MarkupOption, NodeOption, OptionGroup, OptionValue, OptionsManager,
    ParsingOption, SymbolOptions,
};
