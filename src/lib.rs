//! # land-base
//!
//! Core library for parse-tree based concern markup: grammar-driven tree
//! shaping, land nodes, custom blocks, and remapping of marked nodes after
//! the source changes.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! markup    → Concern points, contexts, similarity, remapping
//!   ↓
//! parser    → Parsing driver, sample lexer and parser
//!   ↓
//! tree      → Tree arena, shaping passes, custom blocks, node factory
//!   ↓
//! grammar   → Symbol options and grammar data
//!   ↓
//! core      → Text helpers
//!   ↓
//! base      → Primitives (locations, messages, well-known symbols)
//! ```

// ============================================================================
// MODULES (dependency order: base → core → grammar → tree → parser → markup)
// ============================================================================

/// Foundation types: locations, messages, well-known symbols
pub mod base;

/// Text normalization and word splitting
pub mod core;

/// Grammar model: symbol options, aliases, custom block settings
pub mod grammar;

/// Parse trees and the passes that shape them
pub mod tree;

/// Parsing driver and the sample parser
pub mod parser;

/// Concern markup and remapping
pub mod markup;

// Re-export foundation types
pub use base::{Message, MessageKind, PointLocation, SegmentLocation};
pub use grammar::Grammar;
pub use markup::{MarkupManager, MarkupSettings, PointContext, RemapCandidateInfo};
pub use parser::{ParsedFile, Parser};
pub use tree::{NodeId, Tree};
