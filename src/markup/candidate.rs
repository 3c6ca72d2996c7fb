//! Scored remap candidates and signal weights.

use std::fmt;

use super::context::PointContext;
use crate::base::SegmentLocation;
use crate::tree::NodeId;

/// A context signal scored for every candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextKind {
    HeaderCore,
    HeaderSequence,
    Inner,
    Ancestors,
    Siblings,
}

impl ContextKind {
    pub const ALL: [ContextKind; 5] = [
        ContextKind::HeaderCore,
        ContextKind::HeaderSequence,
        ContextKind::Inner,
        ContextKind::Ancestors,
        ContextKind::Siblings,
    ];

    /// Weight used when no heuristic decided otherwise
    pub fn default_weight(self) -> f64 {
        match self {
            Self::HeaderCore => 3.0,
            Self::HeaderSequence => 1.0,
            Self::Inner => 2.0,
            Self::Ancestors => 1.0,
            Self::Siblings => 0.5,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-signal weights; unset weights count as zero
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Weights {
    values: [Option<f64>; 5],
}

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ContextKind) -> Option<f64> {
        self.values[kind.index()]
    }

    pub fn set(&mut self, kind: ContextKind, weight: f64) {
        self.values[kind.index()] = Some(weight);
    }

    pub fn is_set(&self, kind: ContextKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn is_zero(&self, kind: ContextKind) -> bool {
        self.get(kind) == Some(0.0)
    }

    pub fn unset(&self) -> impl Iterator<Item = ContextKind> + '_ {
        ContextKind::ALL.into_iter().filter(|k| !self.is_set(*k))
    }

    pub fn resolved(&self, kind: ContextKind) -> f64 {
        self.get(kind).unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        ContextKind::ALL.iter().map(|k| self.resolved(*k)).sum()
    }
}

/// A node that may be the new home of a concern point
#[derive(Debug, Clone, PartialEq)]
pub struct RemapCandidateInfo {
    pub node: NodeId,
    pub file_name: String,
    pub context: PointContext,
    /// Location of the node in its tree, with lines and columns
    pub location: Option<SegmentLocation>,

    pub header_core: f64,
    pub header_sequence: f64,
    pub inner: f64,
    pub ancestors: f64,
    pub siblings: f64,

    /// Combined score, `None` until scored
    pub similarity: Option<f64>,
    pub weights: Option<Weights>,
    /// Good and unambiguous enough to be taken without asking
    pub is_auto: bool,
}

impl RemapCandidateInfo {
    pub fn new(node: NodeId, file_name: impl Into<String>, context: PointContext) -> Self {
        Self {
            node,
            file_name: file_name.into(),
            context,
            location: None,
            header_core: 0.0,
            header_sequence: 0.0,
            inner: 0.0,
            ancestors: 0.0,
            siblings: 0.0,
            similarity: None,
            weights: None,
            is_auto: false,
        }
    }

    pub fn with_location(mut self, location: Option<SegmentLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn score(&self, kind: ContextKind) -> f64 {
        match kind {
            ContextKind::HeaderCore => self.header_core,
            ContextKind::HeaderSequence => self.header_sequence,
            ContextKind::Inner => self.inner,
            ContextKind::Ancestors => self.ancestors,
            ContextKind::Siblings => self.siblings,
        }
    }

    pub fn similarity_or_zero(&self) -> f64 {
        self.similarity.unwrap_or(0.0)
    }
}

impl fmt::Display for RemapCandidateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.4} [HC: {:.2}; H: {:.2}; A: {:.2}; I: {:.2}; S: {:.2}]",
            self.similarity_or_zero(),
            self.header_core,
            self.header_sequence,
            self.ancestors,
            self.inner,
            self.siblings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_track_unset_kinds() {
        let mut weights = Weights::new();
        weights.set(ContextKind::Inner, 0.0);
        weights.set(ContextKind::HeaderCore, 2.0);

        let unset: Vec<ContextKind> = weights.unset().collect();
        assert_eq!(
            unset,
            vec![ContextKind::HeaderSequence, ContextKind::Ancestors, ContextKind::Siblings]
        );
        assert!(weights.is_zero(ContextKind::Inner));
        assert_eq!(weights.total(), 2.0);
    }
}
