//! Parse trees and everything that reshapes them.
//!
//! - [`Tree`], [`NodeId`] - Arena-backed parse tree with lazy locations
//! - [`TreeVisitor`] - Pass over a tree
//! - [`visitors`] - Option-driven shaping passes
//! - [`CustomBlockScanner`], [`CustomBlockInserter`] - User-delimited blocks
//! - [`Pipeline`] - Fixed order of shaping passes
//! - [`Preprocessor`] - Text rewriting before parsing, tree repair after it

mod custom_blocks;
mod factory;
mod node;
mod pipeline;
mod visitor;
pub mod visitors;

pub use custom_blocks::{CustomBlock, CustomBlockInserter, CustomBlockScanner, CustomBlockValidator};
pub use factory::{NodeConstructor, NodeFactory};
pub use node::{NodeData, NodeId, Tree};
pub use pipeline::{
    DirectiveStripper, Pipeline, PipelinePreprocessor, Preprocessed, Preprocessor, RemovedSegment, SegmentShift,
};
pub use visitor::{TreeVisitor, walk_children};
