//! Grammar options attached to symbols.
//!
//! Options are grouped (`nodes`, `parsing`, `customblock`, `markup`) and may
//! carry parameters. The [`OptionsManager`] stores the options declared for
//! each grammar symbol; [`SymbolOptions`] is the per-node view produced by
//! the tree visitors.

use indexmap::IndexMap;
use smol_str::SmolStr;
use std::fmt;

use crate::base::constants::DEFAULT_PRIORITY;

/// A parameter attached to an option
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Int(i64),
    Double(f64),
    Str(String),
    StrList(Vec<String>),
}

impl OptionValue {
    /// Numeric view of the parameter
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::Str(s) => s.trim().parse().ok(),
            Self::StrList(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// All strings carried by the parameter
    pub fn strings(&self) -> Vec<&str> {
        match self {
            Self::Str(s) => vec![s.as_str()],
            Self::StrList(list) => list.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        Self::StrList(v)
    }
}

// ============================================================================
// Option names
// ============================================================================

/// Option group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionGroup {
    Nodes,
    Parsing,
    CustomBlock,
    Markup,
}

impl OptionGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nodes => "nodes",
            Self::Parsing => "parsing",
            Self::CustomBlock => "customblock",
            Self::Markup => "markup",
        }
    }
}

/// Tree-shaping options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOption {
    /// Node is removed, its children take its place
    Ghost,
    /// Same-symbol children are flattened into the node
    List,
    /// Subtree collapses into the node's value
    Leaf,
    /// Node is removed together with its subtree
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParsingOption {
    Start,
    Skip,
    IgnoreCase,
    Fragment,
    IgnoreUndefined,
    Recovery,
    Userify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomBlockOption {
    /// Token whose lexemes may delimit custom blocks
    BaseToken,
    /// Prefix and suffix of a block-opening lexeme
    Start,
    /// Prefix and suffix of a block-closing lexeme
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkupOption {
    /// Node can carry a concern point
    Land,
    Priority,
    /// Header element compared as a whole, not by words
    ExactMatch,
    /// Types of header elements forming the header core
    HeaderCore,
    /// Several same-typed siblings may be textually identical
    NotUnique,
}

/// Any grammar option, tagged with its group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarOption {
    Node(NodeOption),
    Parsing(ParsingOption),
    CustomBlock(CustomBlockOption),
    Markup(MarkupOption),
}

impl GrammarOption {
    pub fn group(&self) -> OptionGroup {
        match self {
            Self::Node(_) => OptionGroup::Nodes,
            Self::Parsing(_) => OptionGroup::Parsing,
            Self::CustomBlock(_) => OptionGroup::CustomBlock,
            Self::Markup(_) => OptionGroup::Markup,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Node(o) => match o {
                NodeOption::Ghost => "ghost",
                NodeOption::List => "list",
                NodeOption::Leaf => "leaf",
                NodeOption::Void => "void",
            },
            Self::Parsing(o) => match o {
                ParsingOption::Start => "start",
                ParsingOption::Skip => "skip",
                ParsingOption::IgnoreCase => "ignorecase",
                ParsingOption::Fragment => "fragment",
                ParsingOption::IgnoreUndefined => "ignoreundefined",
                ParsingOption::Recovery => "recovery",
                ParsingOption::Userify => "userify",
            },
            Self::CustomBlock(o) => match o {
                CustomBlockOption::BaseToken => "basetoken",
                CustomBlockOption::Start => "start",
                CustomBlockOption::End => "end",
            },
            Self::Markup(o) => match o {
                MarkupOption::Land => "land",
                MarkupOption::Priority => "priority",
                MarkupOption::ExactMatch => "exactmatch",
                MarkupOption::HeaderCore => "headercore",
                MarkupOption::NotUnique => "notunique",
            },
        }
    }

    /// Resolve an option written in a grammar file. Names are
    /// case-insensitive.
    pub fn parse(group: &str, name: &str) -> Option<Self> {
        let group = group.to_lowercase();
        let name = name.to_lowercase();

        let option = match (group.as_str(), name.as_str()) {
            ("nodes", "ghost") => NodeOption::Ghost.into(),
            ("nodes", "list") => NodeOption::List.into(),
            ("nodes", "leaf") => NodeOption::Leaf.into(),
            ("nodes", "void") => NodeOption::Void.into(),
            ("parsing", "start") => ParsingOption::Start.into(),
            ("parsing", "skip") => ParsingOption::Skip.into(),
            ("parsing", "ignorecase") => ParsingOption::IgnoreCase.into(),
            ("parsing", "fragment") => ParsingOption::Fragment.into(),
            ("parsing", "ignoreundefined") => ParsingOption::IgnoreUndefined.into(),
            ("parsing", "recovery") => ParsingOption::Recovery.into(),
            ("parsing", "userify") => ParsingOption::Userify.into(),
            ("customblock", "basetoken") => CustomBlockOption::BaseToken.into(),
            ("customblock", "start") => CustomBlockOption::Start.into(),
            ("customblock", "end") => CustomBlockOption::End.into(),
            ("markup", "land") => MarkupOption::Land.into(),
            ("markup", "priority") => MarkupOption::Priority.into(),
            ("markup", "exactmatch") => MarkupOption::ExactMatch.into(),
            ("markup", "headercore") => MarkupOption::HeaderCore.into(),
            ("markup", "notunique") => MarkupOption::NotUnique.into(),
            _ => return None,
        };

        Some(option)
    }
}

impl fmt::Display for GrammarOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group().as_str(), self.name())
    }
}

impl From<NodeOption> for GrammarOption {
    fn from(o: NodeOption) -> Self {
        Self::Node(o)
    }
}

impl From<ParsingOption> for GrammarOption {
    fn from(o: ParsingOption) -> Self {
        Self::Parsing(o)
    }
}

impl From<CustomBlockOption> for GrammarOption {
    fn from(o: CustomBlockOption) -> Self {
        Self::CustomBlock(o)
    }
}

impl From<MarkupOption> for GrammarOption {
    fn from(o: MarkupOption) -> Self {
        Self::Markup(o)
    }
}

// ============================================================================
// Option sets
// ============================================================================

/// Options of a single symbol or node, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolOptions {
    options: IndexMap<GrammarOption, Vec<OptionValue>>,
}

impl SymbolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, option: impl Into<GrammarOption>, params: Vec<OptionValue>) {
        self.options.insert(option.into(), params);
    }

    pub fn unset(&mut self, option: impl Into<GrammarOption>) {
        self.options.shift_remove(&option.into());
    }

    pub fn is_set(&self, option: impl Into<GrammarOption>) -> bool {
        self.options.contains_key(&option.into())
    }

    pub fn params(&self, option: impl Into<GrammarOption>) -> &[OptionValue] {
        self.options.get(&option.into()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Is any option of the group set?
    pub fn has_group(&self, group: OptionGroup) -> bool {
        self.options.keys().any(|o| o.group() == group)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GrammarOption, &Vec<OptionValue>)> {
        self.options.iter()
    }

    // =========================================================================
    // Markup accessors
    // =========================================================================

    pub fn priority(&self) -> Option<f64> {
        self.params(MarkupOption::Priority).first().and_then(OptionValue::as_f64)
    }

    /// Priority, or the default one if none was configured
    pub fn priority_or_default(&self) -> f64 {
        self.priority().unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn set_priority(&mut self, priority: f64) {
        self.set(MarkupOption::Priority, vec![OptionValue::Double(priority)]);
    }

    pub fn is_land(&self) -> bool {
        self.is_set(MarkupOption::Land)
    }

    pub fn exact_match(&self) -> bool {
        self.is_set(MarkupOption::ExactMatch)
    }

    pub fn not_unique(&self) -> bool {
        self.is_set(MarkupOption::NotUnique)
    }

    /// Element types forming the header core
    pub fn header_core(&self) -> Vec<&str> {
        self.params(MarkupOption::HeaderCore)
            .iter()
            .flat_map(OptionValue::strings)
            .collect()
    }
}

/// Symbol name under which language-wide options are stored
const GLOBAL_SYMBOL: &str = "";

/// Options declared in a grammar, per symbol.
///
/// Language-wide options live under the empty symbol.
#[derive(Debug, Clone, Default)]
pub struct OptionsManager {
    symbols: IndexMap<SmolStr, SymbolOptions>,
}

impl OptionsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option for the given symbols. An empty symbol list sets the
    /// option globally.
    pub fn set(&mut self, option: impl Into<GrammarOption>, symbols: &[&str], params: Vec<OptionValue>) {
        let option = option.into();

        if symbols.is_empty() {
            self.set_global(option, params);
            return;
        }

        for symbol in symbols {
            self.symbols
                .entry(SmolStr::new(symbol))
                .or_default()
                .set(option, params.clone());
        }
    }

    pub fn set_global(&mut self, option: impl Into<GrammarOption>, params: Vec<OptionValue>) {
        self.symbols
            .entry(SmolStr::new_static(GLOBAL_SYMBOL))
            .or_default()
            .set(option, params);
    }

    /// Is the option set for `symbol`? An empty symbol asks about the
    /// language-wide option.
    pub fn is_set(&self, option: impl Into<GrammarOption>, symbol: &str) -> bool {
        self.symbols
            .get(symbol)
            .is_some_and(|opts| opts.is_set(option))
    }

    pub fn is_set_globally(&self, option: impl Into<GrammarOption>) -> bool {
        self.is_set(option, GLOBAL_SYMBOL)
    }

    /// Parameters of the option for `symbol`, empty if it is not set
    pub fn get_params(&self, option: impl Into<GrammarOption>, symbol: &str) -> &[OptionValue] {
        self.symbols
            .get(symbol)
            .map(|opts| opts.params(option))
            .unwrap_or(&[])
    }

    /// Symbols the option is set for, in declaration order
    pub fn get_symbols(&self, option: impl Into<GrammarOption>) -> Vec<SmolStr> {
        let option = option.into();
        self.symbols
            .iter()
            .filter(|(symbol, opts)| !symbol.is_empty() && opts.is_set(option))
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    /// All options declared for `symbol`
    pub fn symbol_options(&self, symbol: &str) -> Option<&SymbolOptions> {
        self.symbols.get(symbol)
    }

    /// Remove the option from every symbol
    pub fn clear(&mut self, option: impl Into<GrammarOption>) {
        let option = option.into();
        for opts in self.symbols.values_mut() {
            opts.unset(option);
        }
    }
}
