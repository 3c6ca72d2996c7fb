//! Well-known symbol names shared by the grammar, the tree visitors and the
//! markup layer.

/// Terminal that matches an arbitrary run of text
pub const ANY: &str = "Any";

/// Marker token opening a user-delimited custom block
pub const CUSTOM_BLOCK_START: &str = "CUSTOM_BLOCK_START";

/// Marker token closing a user-delimited custom block
pub const CUSTOM_BLOCK_END: &str = "CUSTOM_BLOCK_END";

/// Synthetic rule wrapping a custom block in the tree
pub const CUSTOM_BLOCK_RULE: &str = "custom_block";

/// Prefix of helper rules generated for grammar sugar; removed from trees
pub const AUTO_RULE_PREFIX: &str = "auto__";

pub const EOF: &str = "EOF";
pub const ERROR: &str = "ERROR";

/// Default header priority of a node that has none configured
pub const DEFAULT_PRIORITY: f64 = 1.0;
