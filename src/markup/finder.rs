//! Candidate scoring.
//!
//! A [`ContextFinder`] scores every candidate of one point and ranks them.
//! Points are independent of each other, so [`ContextFinder::find`] scores
//! them on the rayon pool, checking for cancellation once per point.

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::candidate::{ContextKind, RemapCandidateInfo, Weights};
use super::context::{AncestorsContextElement, HeaderContextElement, PointContext};
use super::heuristics::{
    ContextsEquality, SimilarityHeuristic, WeightsHeuristic, default_similarity_heuristics,
    default_weights_heuristics, default_weights,
};
use super::settings::MarkupSettings;
use super::similarity::{Signal, similarity};

/// One point and the candidates it is scored against
#[derive(Debug, Clone, Copy)]
pub struct FindRequest<'a> {
    pub point: &'a PointContext,
    pub candidates: &'a [RemapCandidateInfo],
}

pub trait ContextFinder: Send + Sync {
    fn settings(&self) -> &MarkupSettings;

    /// Score `candidates` for `point`, best first. Only the first
    /// candidate may be marked auto.
    fn evaluate(&self, point: &PointContext, candidates: Vec<RemapCandidateInfo>) -> Vec<RemapCandidateInfo>;

    /// Evaluate every request. Returns `None` if cancelled.
    fn find(&self, requests: &[FindRequest<'_>], cancel: &CancellationToken) -> Option<Vec<Vec<RemapCandidateInfo>>> {
        let run = |request: &FindRequest<'_>| {
            if cancel.is_cancelled() {
                return None;
            }
            let ranked = self.evaluate(request.point, request.candidates.to_vec());
            debug!(
                "scored {} candidates for {} in {}",
                ranked.len(),
                request.point.node_type,
                request.point.file_name
            );
            Some(ranked)
        };

        if self.settings().parallel {
            requests.par_iter().map(run).collect()
        } else {
            requests.iter().map(run).collect()
        }
    }
}

fn core_elements(point: &PointContext) -> Vec<HeaderContextElement> {
    point.header.core_elements().cloned().collect()
}

fn header_scores(point: &PointContext, candidate: &mut RemapCandidateInfo) {
    candidate.header_sequence = similarity(
        Signal::Header(&point.header.sequence),
        Signal::Header(&candidate.context.header.sequence),
    );
    candidate.header_core = similarity(
        Signal::Header(&core_elements(point)),
        Signal::Header(&core_elements(&candidate.context)),
    );
    candidate.ancestors = similarity(
        Signal::Ancestors(&point.ancestors),
        Signal::Ancestors(&candidate.context.ancestors),
    );
}

/// Winner taken without asking: similar enough, no perfect runner-up, and
/// the runner-up far enough behind
pub(crate) fn is_auto_choice(settings: &MarkupSettings, first: f64, second: Option<f64>) -> bool {
    settings.is_similar_enough(first) && second != Some(1.0) && settings.are_distant_enough(first, second)
}

/// Sort best first and decide whether the winner is taken automatically
fn rank(mut candidates: Vec<RemapCandidateInfo>, settings: &MarkupSettings) -> Vec<RemapCandidateInfo> {
    candidates.sort_by(|a, b| b.similarity_or_zero().total_cmp(&a.similarity_or_zero()));

    let second = candidates.get(1).map(RemapCandidateInfo::similarity_or_zero);
    if let Some(first) = candidates.first_mut() {
        first.is_auto = is_auto_choice(settings, first.similarity_or_zero(), second);
    }

    candidates
}

/// Share of inner elements found on both sides
fn inner_elements_ratio(a: &[AncestorsContextElement], b: &[AncestorsContextElement]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let mut unmatched: Vec<&AncestorsContextElement> = b.iter().collect();
    let common = a
        .iter()
        .filter(|x| match unmatched.iter().position(|y| y == x) {
            Some(i) => {
                unmatched.swap_remove(i);
                true
            }
            None => false,
        })
        .count();

    common as f64 / a.len().max(b.len()) as f64
}

/// Fixed-weight scoring over header, ancestors and inner elements
#[derive(Debug, Clone, Default)]
pub struct BasicContextFinder {
    settings: MarkupSettings,
}

impl BasicContextFinder {
    pub fn new(settings: MarkupSettings) -> Self {
        Self { settings }
    }
}

impl ContextFinder for BasicContextFinder {
    fn settings(&self) -> &MarkupSettings {
        &self.settings
    }

    fn evaluate(&self, point: &PointContext, mut candidates: Vec<RemapCandidateInfo>) -> Vec<RemapCandidateInfo> {
        for candidate in &mut candidates {
            header_scores(point, candidate);
            candidate.inner = inner_elements_ratio(&point.inner.elements, &candidate.context.inner.elements);
            candidate.similarity =
                Some((3.0 * candidate.header_sequence + 2.0 * candidate.ancestors + candidate.inner) / 6.0);
        }

        rank(candidates, &self.settings)
    }
}

/// Scoring with all five signals and heuristically tuned weights
#[derive(Debug, Clone)]
pub struct HeuristicContextFinder {
    settings: MarkupSettings,
    weights_heuristics: Vec<WeightsHeuristic>,
    similarity_heuristics: Vec<SimilarityHeuristic>,
}

impl Default for HeuristicContextFinder {
    fn default() -> Self {
        Self::new(MarkupSettings::default())
    }
}

impl HeuristicContextFinder {
    pub fn new(settings: MarkupSettings) -> Self {
        Self {
            settings,
            weights_heuristics: default_weights_heuristics(),
            similarity_heuristics: default_similarity_heuristics(),
        }
    }

    /// Replace the weight tuning pipeline; heuristics run in the given order
    pub fn with_weights_heuristics(mut self, heuristics: Vec<WeightsHeuristic>) -> Self {
        self.weights_heuristics = heuristics;
        self
    }

    pub fn with_similarity_heuristics(mut self, heuristics: Vec<SimilarityHeuristic>) -> Self {
        self.similarity_heuristics = heuristics;
        self
    }

    fn compute_scores(&self, point: &PointContext, candidate: &mut RemapCandidateInfo) {
        header_scores(point, candidate);
        candidate.inner = point.inner.content.similarity(&candidate.context.inner.content);
        candidate.siblings = match (&point.siblings, &candidate.context.siblings) {
            (Some(a), Some(b)) => (a.before.similarity(&b.before) + a.after.similarity(&b.after)) / 2.0,
            _ => 0.0,
        };
    }

    fn tune_weights(&self, point: &PointContext, candidates: &[RemapCandidateInfo]) -> Weights {
        let mut weights = Weights::new();

        if candidates.len() == 1 {
            default_weights(point, candidates, &mut weights, &self.settings);
        } else {
            for heuristic in &self.weights_heuristics {
                heuristic(point, candidates, &mut weights, &self.settings);
            }
        }

        weights
    }
}

impl ContextFinder for HeuristicContextFinder {
    fn settings(&self) -> &MarkupSettings {
        &self.settings
    }

    fn evaluate(&self, point: &PointContext, mut candidates: Vec<RemapCandidateInfo>) -> Vec<RemapCandidateInfo> {
        if candidates.is_empty() {
            return candidates;
        }

        if let Some(same) = ContextsEquality::get_same_element(point, &candidates) {
            debug!("{} in {} is unchanged", point.node_type, point.file_name);
            let mut found = candidates.swap_remove(same);
            self.compute_scores(point, &mut found);
            found.similarity = Some(1.0);
            found.is_auto = true;
            candidates.insert(0, found);
            return candidates;
        }

        for candidate in &mut candidates {
            self.compute_scores(point, candidate);
        }

        let weights = self.tune_weights(point, &candidates);
        debug!(
            "weights for {}: HC {:?} H {:?} I {:?} A {:?} S {:?}",
            point.node_type,
            weights.get(ContextKind::HeaderCore),
            weights.get(ContextKind::HeaderSequence),
            weights.get(ContextKind::Inner),
            weights.get(ContextKind::Ancestors),
            weights.get(ContextKind::Siblings)
        );

        if candidates.len() > 1 {
            for heuristic in &self.similarity_heuristics {
                heuristic(point, &mut candidates);
            }
        }

        let total = weights.total();
        for candidate in &mut candidates {
            if candidate.similarity.is_none() {
                let weighted: f64 = ContextKind::ALL
                    .iter()
                    .map(|k| weights.resolved(*k) * candidate.score(*k))
                    .sum();
                candidate.similarity = Some(if total > 0.0 { weighted / total } else { 0.0 });
            }
            candidate.weights = Some(weights);
            trace!("candidate {}", candidate);
        }

        rank(candidates, &self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::context::{HeaderContext, InnerContext, PrioritizedWord};
    use crate::markup::text_hash::TextOrHash;
    use crate::tree::Tree;
    use smol_str::SmolStr;

    fn context(name: &str, body: &str) -> PointContext {
        PointContext {
            node_type: SmolStr::new("method"),
            header: HeaderContext {
                sequence: vec![HeaderContextElement {
                    node_type: SmolStr::new("ID"),
                    priority: 1.0,
                    exact_match: false,
                    value: vec![PrioritizedWord {
                        text: name.to_string(),
                        priority: 1.0,
                    }],
                }],
                core: vec![0],
                non_core: vec![],
            },
            inner: InnerContext {
                content: TextOrHash::new(body),
                elements: vec![],
            },
            ..PointContext::default()
        }
    }

    fn candidates(contexts: Vec<PointContext>) -> Vec<RemapCandidateInfo> {
        let mut tree = Tree::new();
        contexts
            .into_iter()
            .map(|c| RemapCandidateInfo::new(tree.new_node("method"), "a.cs", c))
            .collect()
    }

    #[test]
    fn test_no_candidates() {
        let finder = HeuristicContextFinder::default();
        assert!(finder.evaluate(&context("Foo", "{}"), Vec::new()).is_empty());
    }

    #[test]
    fn test_self_similarity_is_one() {
        let point = context("Compute", "{ return left + right; }");
        let finder = HeuristicContextFinder::default();
        let mut candidate = candidates(vec![point.clone()]).remove(0);
        finder.compute_scores(&point, &mut candidate);

        for kind in [ContextKind::HeaderCore, ContextKind::HeaderSequence, ContextKind::Inner, ContextKind::Ancestors] {
            assert_eq!(candidate.score(kind), 1.0, "{:?}", kind);
        }
    }

    #[test]
    fn test_renamed_single_candidate_is_auto() {
        let point = context("getValue", "{ return value; }");
        let ranked = HeuristicContextFinder::default()
            .evaluate(&point, candidates(vec![context("getValues", "{ return value; }")]));

        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].is_auto, "{}", ranked[0]);
        assert!(ranked[0].similarity_or_zero() < 1.0);
    }

    #[test]
    fn test_identical_candidates_are_ambiguous() {
        let point = context("Foo", "{ return 1; }");
        let ranked = HeuristicContextFinder::default().evaluate(
            &point,
            candidates(vec![context("Foo", "{ return 1; }"), context("Foo", "{ return 1; }")]),
        );

        assert_eq!(ranked.len(), 2);
        assert!(!ranked[0].is_auto);
        assert_eq!(ranked[0].similarity, ranked[1].similarity);
    }

    #[test]
    fn test_unrelated_addition_keeps_auto_decision() {
        let point = context("getValue", "{ return value; }");
        let finder = HeuristicContextFinder::default();

        let base = finder.evaluate(&point, candidates(vec![context("getValues", "{ return value; }")]));
        let wider = finder.evaluate(
            &point,
            candidates(vec![
                context("getValues", "{ return value; }"),
                context("clear", "{ items = null; }"),
            ]),
        );

        assert!(base[0].is_auto);
        assert!(wider[0].is_auto, "{}", wider[0]);
        assert_eq!(wider[0].context, base[0].context);
    }

    #[test]
    fn test_custom_weights_pipeline() {
        let point = context("Foo", "{ return 1; }");
        let finder = HeuristicContextFinder::default().with_weights_heuristics(vec![default_weights]);
        let ranked = finder.evaluate(
            &point,
            candidates(vec![context("Fob", "{ return 2; }"), context("Bar", "{ return 1; }")]),
        );

        let weights = ranked[0].weights.expect("weights");
        for kind in ContextKind::ALL {
            assert_eq!(weights.get(kind), Some(kind.default_weight()));
        }
    }

    #[test]
    fn test_basic_finder_weights() {
        let point = context("Foo", "{}");
        let ranked = BasicContextFinder::default().evaluate(&point, candidates(vec![point.clone()]));

        assert_eq!(ranked[0].similarity, Some(1.0));
        assert!(ranked[0].is_auto);
    }

    #[test]
    fn test_basic_finder_rejects_identical_duplicates() {
        let point = context("Foo", "{}");
        let ranked = BasicContextFinder::default().evaluate(&point, candidates(vec![point.clone(), point.clone()]));

        assert_eq!(ranked[0].similarity, Some(1.0));
        assert_eq!(ranked[1].similarity, Some(1.0));
        assert!(!ranked[0].is_auto);
    }

    #[test]
    fn test_inner_elements_ratio() {
        let element = |name: &str| AncestorsContextElement {
            node_type: SmolStr::new("field"),
            header: context(name, "").header,
        };

        assert_eq!(inner_elements_ratio(&[], &[]), 1.0);
        assert_eq!(inner_elements_ratio(&[element("a")], &[]), 0.0);
        assert_eq!(
            inner_elements_ratio(&[element("a"), element("b")], &[element("b"), element("c"), element("d"), element("e")]),
            0.25
        );
    }

    #[test]
    fn test_find_respects_cancellation() {
        let point = context("Foo", "{}");
        let list = candidates(vec![point.clone()]);
        let requests = [FindRequest {
            point: &point,
            candidates: &list,
        }];
        let finder = HeuristicContextFinder::new(MarkupSettings::default().with_parallel(false));

        let cancel = CancellationToken::new();
        assert_eq!(finder.find(&requests, &cancel).map(|r| r.len()), Some(1));

        cancel.cancel();
        assert!(finder.find(&requests, &cancel).is_none());
    }
}
