//! Concern markup and its remapping.
//!
//! A concern point remembers a node by its [`PointContext`]. When the file
//! changes, [`MarkupManager::remap`] scores every same-typed node of the
//! new tree against the stored context and rebinds the point if the best
//! candidate is good and unambiguous enough.
//!
//! - [`context`] - What is remembered about a node
//! - [`similarity`] - Levenshtein-based similarity of context signals
//! - [`heuristics`] - Ordered weight and similarity adjustments
//! - [`finder`] - Candidate scoring and ranking
//! - [`manager`] - The concern forest and remap orchestration

mod assignment;
mod candidate;
pub mod context;
mod error;
pub mod finder;
pub mod heuristics;
mod manager;
mod persist;
mod point;
mod settings;
pub mod similarity;
mod text_hash;

pub use candidate::{ContextKind, RemapCandidateInfo, Weights};
pub use context::{
    AncestorsContextElement, HeaderContext, HeaderContextElement, InnerContext, PointContext, PrioritizedWord,
    SiblingsContext,
};
pub use error::MarkupError;
pub use finder::{BasicContextFinder, ContextFinder, FindRequest, HeuristicContextFinder};
pub use heuristics::{ContextsEquality, SimilarityHeuristic, WeightsHeuristic};
pub use manager::{Ambiguities, MarkupManager, SearchMode};
pub use point::{Concern, ConcernPoint, MarkupElement};
pub use settings::MarkupSettings;
pub use text_hash::TextOrHash;
