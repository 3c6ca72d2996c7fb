//! Exclusive assignment of candidates to the points of one group.
//!
//! Each point is scored on its own, so two points may end up preferring
//! the same node. A node keeps at most one point: perfect auto matches
//! claim their node first, and the remaining points share the unclaimed
//! nodes by maximum weight matching.

use indexmap::IndexSet;
use rustc_hash::FxHashSet;

use super::candidate::RemapCandidateInfo;
use super::finder::is_auto_choice;
use super::settings::MarkupSettings;
use crate::tree::NodeId;

type CandidateKey = (String, NodeId);

fn key(candidate: &RemapCandidateInfo) -> CandidateKey {
    (candidate.file_name.clone(), candidate.node)
}

/// Row to column assignment maximising the total weight.
///
/// Rows may be ragged; missing cells weigh 0. A row left without a real
/// column (more rows than columns) gets `None`.
pub(crate) fn maximum_matching(weights: &[Vec<f64>]) -> Vec<Option<usize>> {
    let rows = weights.len();
    let columns = weights.iter().map(Vec::len).max().unwrap_or(0);
    let width = columns.max(rows);
    let cost = |row: usize, column: usize| -weights[row - 1].get(column - 1).copied().unwrap_or(0.0);

    // Hungarian method with potentials; index 0 is the virtual start column
    let mut row_potential = vec![0.0; rows + 1];
    let mut column_potential = vec![0.0; width + 1];
    let mut owner = vec![0usize; width + 1];
    let mut way = vec![0usize; width + 1];

    for row in 1..=rows {
        owner[0] = row;
        let mut current = 0;
        let mut min_slack = vec![f64::INFINITY; width + 1];
        let mut used = vec![false; width + 1];

        loop {
            used[current] = true;
            let current_row = owner[current];
            let mut delta = f64::INFINITY;
            let mut next = 0;

            for column in 1..=width {
                if used[column] {
                    continue;
                }
                let slack = cost(current_row, column) - row_potential[current_row] - column_potential[column];
                if slack < min_slack[column] {
                    min_slack[column] = slack;
                    way[column] = current;
                }
                if min_slack[column] < delta {
                    delta = min_slack[column];
                    next = column;
                }
            }

            for column in 0..=width {
                if used[column] {
                    row_potential[owner[column]] += delta;
                    column_potential[column] -= delta;
                } else {
                    min_slack[column] -= delta;
                }
            }

            current = next;
            if owner[current] == 0 {
                break;
            }
        }

        while current != 0 {
            let previous = way[current];
            owner[current] = owner[previous];
            current = previous;
        }
    }

    let mut assignment = vec![None; rows];
    for column in 1..=columns {
        if owner[column] != 0 {
            assignment[owner[column] - 1] = Some(column - 1);
        }
    }
    assignment
}

/// Make auto decisions of one group exclusive.
///
/// `results` holds the ranked candidates of each point of the group. After
/// the call at most one point per node has an auto candidate, and it is
/// first in its list. Candidates claimed by other points stay listed for
/// the ambiguity report.
pub(crate) fn assign_exclusively(results: &mut [Vec<RemapCandidateInfo>], settings: &MarkupSettings) {
    let mut claimed: FxHashSet<CandidateKey> = FxHashSet::default();
    let mut open = Vec::new();
    for (row, candidates) in results.iter().enumerate() {
        match candidates.first().filter(|c| c.is_auto && c.similarity == Some(1.0)) {
            Some(first) if claimed.insert(key(first)) => {}
            _ => open.push(row),
        }
    }
    if open.is_empty() {
        return;
    }

    let columns: IndexSet<CandidateKey> = open
        .iter()
        .flat_map(|row| results[*row].iter().map(key))
        .filter(|k| !claimed.contains(k))
        .collect();
    let weights: Vec<Vec<f64>> = open
        .iter()
        .map(|row| {
            let mut line = vec![0.0; columns.len()];
            for candidate in &results[*row] {
                if let Some(column) = columns.get_index_of(&key(candidate)) {
                    line[column] = candidate.similarity_or_zero();
                }
            }
            line
        })
        .collect();
    let matching = maximum_matching(&weights);

    for (index, row) in open.iter().enumerate() {
        let taken_by_others: FxHashSet<&CandidateKey> = matching
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .filter_map(|(_, column)| column.and_then(|c| columns.get_index(c)))
            .collect();
        let matched = matching[index].and_then(|c| columns.get_index(c));

        let candidates = &mut results[*row];
        for candidate in candidates.iter_mut() {
            candidate.is_auto = false;
        }
        let Some(position) = matched.and_then(|m| candidates.iter().position(|c| key(c) == *m)) else {
            continue;
        };

        let similarity = candidates[position].similarity_or_zero();
        let runner_up = candidates
            .iter()
            .enumerate()
            .filter(|(i, c)| {
                let k = key(c);
                *i != position && !claimed.contains(&k) && !taken_by_others.contains(&k)
            })
            .map(|(_, c)| c.similarity_or_zero())
            .max_by(f64::total_cmp);

        if is_auto_choice(settings, similarity, runner_up) {
            candidates[..=position].rotate_right(1);
            candidates[0].is_auto = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::context::PointContext;
    use crate::tree::Tree;
    use rstest::rstest;

    /// Id of the `index`-th node of a fresh tree
    fn node(index: usize) -> NodeId {
        let mut tree = Tree::new();
        let mut last = tree.new_node("method");
        for _ in 0..index {
            last = tree.new_node("method");
        }
        last
    }

    fn scored(index: usize, similarity: f64, is_auto: bool) -> RemapCandidateInfo {
        let mut candidate = RemapCandidateInfo::new(node(index), "a.cs", PointContext::default());
        candidate.similarity = Some(similarity);
        candidate.is_auto = is_auto;
        candidate
    }

    #[rstest]
    #[case(vec![vec![0.9, 0.8], vec![0.85, 0.1]], vec![Some(1), Some(0)])]
    #[case(vec![vec![0.5], vec![0.9]], vec![None, Some(0)])]
    #[case(vec![vec![0.2, 0.7, 0.1]], vec![Some(1)])]
    #[case(vec![vec![], vec![0.3]], vec![None, Some(0)])]
    #[case(vec![], vec![])]
    fn test_maximum_matching(#[case] weights: Vec<Vec<f64>>, #[case] expected: Vec<Option<usize>>) {
        assert_eq!(maximum_matching(&weights), expected);
    }

    #[test]
    fn test_perfect_match_claims_its_node() {
        let mut results = vec![
            vec![scored(4, 1.0, true)],
            vec![scored(4, 0.8, true)],
        ];

        assign_exclusively(&mut results, &MarkupSettings::default());

        assert!(results[0][0].is_auto);
        assert_eq!(results[1].len(), 1);
        assert!(!results[1][0].is_auto);
    }

    #[test]
    fn test_contested_node_goes_to_the_closer_point() {
        let mut results = vec![
            vec![scored(4, 0.7, true), scored(7, 0.65, false)],
            vec![scored(4, 0.9, true)],
        ];

        assign_exclusively(&mut results, &MarkupSettings::default());

        assert_eq!(results[1][0].node, node(4));
        assert!(results[1][0].is_auto);
        assert_eq!(results[0][0].node, node(7));
        assert!(results[0][0].is_auto);
    }

    #[test]
    fn test_single_point_keeps_its_decision() {
        let mut results = vec![vec![scored(1, 0.9, false), scored(2, 0.88, false)]];

        assign_exclusively(&mut results, &MarkupSettings::default());

        assert_eq!(results[0][0].node, node(1));
        assert!(!results[0][0].is_auto);
    }
}
