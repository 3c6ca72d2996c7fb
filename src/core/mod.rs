//! Language-independent helpers shared by the tree and markup layers.

pub mod text_utils;

pub use text_utils::{normalize_text, split_words};
