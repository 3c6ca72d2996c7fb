//! Heuristics around candidate scoring.
//!
//! * [`ContextsEquality`] recognises an unchanged node before any
//!   scoring happens.
//! * [`WeightsHeuristic`]s tune signal weights from statistics of the
//!   candidate set. They run in list order; the order is part of the
//!   scoring contract. A stage only fills in or lowers weights, and
//!   never lifts an earlier zero.
//! * [`SimilarityHeuristic`]s assign a final similarity directly.

use super::candidate::{ContextKind, RemapCandidateInfo, Weights};
use super::context::{AncestorsContextElement, PointContext, SiblingsContext};
use super::settings::MarkupSettings;

pub type WeightsHeuristic = fn(&PointContext, &[RemapCandidateInfo], &mut Weights, &MarkupSettings);

pub type SimilarityHeuristic = fn(&PointContext, &mut [RemapCandidateInfo]);

/// Scores at or below this mean the content changed beyond recognition
const FREQUENTLY_CHANGING_THRESHOLD: f64 = 0.6;

/// Body length at which the inner weight reaches half its baseline
const INNER_LENGTH_SATURATION: f64 = 50.0;

/// Weight tuning used when there are several candidates
pub fn default_weights_heuristics() -> Vec<WeightsHeuristic> {
    vec![
        empty_context,
        prioritize_by_gap,
        lower_frequently_changing,
        tune_inner_by_length,
        default_weights,
    ]
}

pub fn default_similarity_heuristics() -> Vec<SimilarityHeuristic> {
    vec![same_header_and_ancestors]
}

fn is_signal_empty(context: &PointContext, kind: ContextKind) -> bool {
    match kind {
        ContextKind::HeaderCore => context.header.core.is_empty(),
        ContextKind::HeaderSequence => context.header.is_empty(),
        ContextKind::Inner => context.inner.content.is_empty(),
        ContextKind::Ancestors => context.ancestors.is_empty(),
        ContextKind::Siblings => context.siblings.as_ref().is_none_or(SiblingsContext::is_empty),
    }
}

/// Zero the weight of a signal empty on the point and on every candidate
pub fn empty_context(
    point: &PointContext,
    candidates: &[RemapCandidateInfo],
    weights: &mut Weights,
    _settings: &MarkupSettings,
) {
    for kind in ContextKind::ALL {
        let empty = is_signal_empty(point, kind) && candidates.iter().all(|c| is_signal_empty(&c.context, kind));
        if empty {
            weights.set(kind, 0.0);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GapFeatures {
    max: f64,
    gap_from_max: f64,
    median_gap: f64,
}

fn gap_features(candidates: &[RemapCandidateInfo], kind: ContextKind) -> Option<GapFeatures> {
    let mut scores: Vec<f64> = candidates.iter().map(|c| c.score(kind)).collect();
    if scores.len() < 2 {
        return None;
    }
    scores.sort_by(|a, b| b.total_cmp(a));

    let mut gaps: Vec<f64> = scores.windows(2).map(|w| w[0] - w[1]).collect();
    gaps.sort_by(|a, b| b.total_cmp(a));
    let middle = gaps.len() / 2;
    let median_gap = if gaps.len() % 2 == 0 {
        (gaps[middle] + gaps[middle - 1]) / 2.0
    } else {
        gaps[middle]
    };

    Some(GapFeatures {
        max: scores[0],
        gap_from_max: scores[0] - scores[1],
        median_gap,
    })
}

/// Rank unset signals by how well they separate the candidates.
///
/// A signal whose best score is too low, or whose winner is too close to
/// the runner-up, gets weight 1. The rest are ordered by median gap and
/// weighted from the number of signals downwards.
pub fn prioritize_by_gap(
    _point: &PointContext,
    candidates: &[RemapCandidateInfo],
    weights: &mut Weights,
    settings: &MarkupSettings,
) {
    let max_weight = ContextKind::ALL.len() as f64;
    let mut to_prioritize: Vec<(ContextKind, f64)> = Vec::new();

    let unset: Vec<ContextKind> = weights.unset().collect();
    for kind in unset {
        let Some(features) = gap_features(candidates, kind) else {
            continue;
        };

        let weak = features.max < settings.candidate_similarity_threshold
            || (1.0 - features.max) * settings.second_distance_gap_coefficient > features.gap_from_max;
        if weak {
            weights.set(kind, 1.0);
        } else {
            to_prioritize.push((kind, features.median_gap));
        }
    }

    to_prioritize.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (rank, (kind, _)) in to_prioritize.into_iter().enumerate() {
        weights.set(kind, max_weight - rank as f64);
    }
}

/// Drop content signals no candidate resembles
pub fn lower_frequently_changing(
    _point: &PointContext,
    candidates: &[RemapCandidateInfo],
    weights: &mut Weights,
    _settings: &MarkupSettings,
) {
    for kind in [ContextKind::Inner, ContextKind::Siblings] {
        let best = candidates.iter().map(|c| c.score(kind)).fold(f64::NEG_INFINITY, f64::max);
        if best <= FREQUENTLY_CHANGING_THRESHOLD {
            weights.set(kind, 0.0);
        }
    }
}

/// Scale the inner weight by `len / (len + 50)` of the point's content
pub fn tune_inner_by_length(
    point: &PointContext,
    _candidates: &[RemapCandidateInfo],
    weights: &mut Weights,
    _settings: &MarkupSettings,
) {
    if weights.is_zero(ContextKind::Inner) {
        return;
    }

    let baseline = weights
        .get(ContextKind::Inner)
        .unwrap_or(ContextKind::Inner.default_weight());
    let length = point.inner.content.text_length as f64;
    weights.set(ContextKind::Inner, baseline * length / (length + INNER_LENGTH_SATURATION));
}

pub fn default_weights(
    _point: &PointContext,
    _candidates: &[RemapCandidateInfo],
    weights: &mut Weights,
    _settings: &MarkupSettings,
) {
    let unset: Vec<ContextKind> = weights.unset().collect();
    for kind in unset {
        weights.set(kind, kind.default_weight());
    }
}

/// The only candidate with a perfect header and perfect ancestors wins
pub fn same_header_and_ancestors(_point: &PointContext, candidates: &mut [RemapCandidateInfo]) {
    let mut perfect = candidates
        .iter_mut()
        .filter(|c| c.header_sequence == 1.0 && c.ancestors == 1.0);

    if let (Some(single), None) = (perfect.next(), perfect.next()) {
        single.similarity = Some(1.0);
    }
}

// ============================================================================
// Pre-heuristic
// ============================================================================

type Predicate = fn(&PointContext, &PointContext) -> bool;

fn same_header_core(a: &PointContext, b: &PointContext) -> bool {
    a.header.equals_by_core(&b.header)
}

fn same_header(a: &PointContext, b: &PointContext) -> bool {
    a.header.sequence == b.header.sequence
}

fn same_inner(a: &PointContext, b: &PointContext) -> bool {
    a.inner.content.text == b.inner.content.text
        && (a.inner.content.hash.is_none() || a.inner.content.hash == b.inner.content.hash)
}

fn same_ancestors_core(a: &PointContext, b: &PointContext) -> bool {
    let same = |x: &AncestorsContextElement, y: &AncestorsContextElement| {
        (!x.header.core.is_empty() && x.header.equals_by_core(&y.header)) || x.header == y.header
    };
    a.ancestors.len() == b.ancestors.len() && a.ancestors.iter().zip(&b.ancestors).all(|(x, y)| same(x, y))
}

fn same_ancestors(a: &PointContext, b: &PointContext) -> bool {
    a.ancestors == b.ancestors
}

/// Finds the candidate that is the point's node unchanged.
///
/// Equality predicates of growing strictness are tried in turn. The
/// point's closest contexts tell which of them were already ambiguous when
/// the point was marked; candidates are then filtered from the first
/// predicate that used to tell the node apart, escalating until at most
/// one candidate is left.
pub struct ContextsEquality;

impl ContextsEquality {
    const BASE: [Predicate; 3] = [same_header_core, same_header, same_inner];
    const ANCESTORS: [Predicate; 2] = [same_ancestors_core, same_ancestors];

    /// Index into `candidates` of the unchanged node
    pub fn get_same_element(point: &PointContext, candidates: &[RemapCandidateInfo]) -> Option<usize> {
        let mut base = if !point.header.core.is_empty() {
            0
        } else if !point.header.is_empty() {
            1
        } else if !point.inner.content.is_empty() {
            2
        } else {
            return None;
        };
        let mut ancestors = 0;

        let mut almost_same: Vec<&PointContext> = point
            .closest
            .iter()
            .filter(|e| Self::ANCESTORS[0](e, point))
            .collect();

        for (level, predicate) in Self::BASE.iter().enumerate().skip(base) {
            almost_same.retain(|e| predicate(e, point));

            if !almost_same.is_empty() {
                for (strictness, stricter) in Self::ANCESTORS.iter().enumerate().skip(1) {
                    if !almost_same.iter().any(|e| stricter(e, point)) {
                        almost_same.clear();
                        ancestors = strictness;
                        break;
                    }
                }
            }

            if almost_same.is_empty() {
                base = level;
                break;
            }
        }

        // Even the strictest predicate could not tell the node from its
        // look-alikes
        if !almost_same.is_empty() {
            return None;
        }

        let mut similar: Vec<usize> = (0..candidates.len())
            .filter(|i| {
                let context = &candidates[*i].context;
                Self::BASE[..=base].iter().all(|p| p(point, context)) && Self::ANCESTORS[ancestors](context, point)
            })
            .collect();
        if similar.len() <= 1 {
            return similar.first().copied();
        }

        for predicate in &Self::BASE[base + 1..] {
            similar.retain(|i| predicate(&candidates[*i].context, point));
            if similar.len() <= 1 {
                return similar.first().copied();
            }

            for stricter in &Self::ANCESTORS[ancestors + 1..] {
                let strict: Vec<usize> = similar
                    .iter()
                    .copied()
                    .filter(|i| stricter(&candidates[*i].context, point))
                    .collect();
                if strict.len() <= 1 {
                    return strict.first().copied();
                }
            }
        }

        None
    }
}
