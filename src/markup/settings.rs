//! Tunables of context extraction and remapping.

/// Remap configuration.
///
/// Defaults are the values the acceptance rules were calibrated with;
/// every field can be overridden with a `with_*` builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkupSettings {
    /// Candidates kept per point in the ambiguity report
    pub ambiguity_top_count: usize,
    /// Candidates scoring below this are dropped by `remap_type`
    pub garbage_threshold: f64,
    /// Minimal similarity of an auto-accepted candidate
    pub candidate_similarity_threshold: f64,
    /// How much farther the runner-up must be than the winner
    pub second_distance_gap_coefficient: f64,
    /// Land descendants kept in the inner context
    pub inner_context_length: usize,
    pub closest_context_count: usize,
    pub closest_context_threshold: f64,
    pub use_siblings: bool,
    /// Files whose contents score above this are searched in
    /// [`SearchMode::SimilarFiles`](super::SearchMode::SimilarFiles)
    pub file_similarity_threshold: f64,
    /// Score points on the rayon pool
    pub parallel: bool,
}

impl Default for MarkupSettings {
    fn default() -> Self {
        Self {
            ambiguity_top_count: 10,
            garbage_threshold: 0.4,
            candidate_similarity_threshold: 0.6,
            second_distance_gap_coefficient: 1.5,
            inner_context_length: 10,
            closest_context_count: 10,
            closest_context_threshold: 0.6,
            use_siblings: true,
            file_similarity_threshold: 0.6,
            parallel: true,
        }
    }
}

impl MarkupSettings {
    pub fn with_ambiguity_top_count(mut self, count: usize) -> Self {
        self.ambiguity_top_count = count;
        self
    }

    pub fn with_garbage_threshold(mut self, threshold: f64) -> Self {
        self.garbage_threshold = threshold;
        self
    }

    pub fn with_candidate_similarity_threshold(mut self, threshold: f64) -> Self {
        self.candidate_similarity_threshold = threshold;
        self
    }

    pub fn with_second_distance_gap_coefficient(mut self, coefficient: f64) -> Self {
        self.second_distance_gap_coefficient = coefficient;
        self
    }

    pub fn with_inner_context_length(mut self, length: usize) -> Self {
        self.inner_context_length = length;
        self
    }

    pub fn with_closest_context_count(mut self, count: usize) -> Self {
        self.closest_context_count = count;
        self
    }

    pub fn with_closest_context_threshold(mut self, threshold: f64) -> Self {
        self.closest_context_threshold = threshold;
        self
    }

    pub fn with_siblings(mut self, use_siblings: bool) -> Self {
        self.use_siblings = use_siblings;
        self
    }

    pub fn with_file_similarity_threshold(mut self, threshold: f64) -> Self {
        self.file_similarity_threshold = threshold;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Winner is similar enough to be taken without asking
    pub fn is_similar_enough(&self, similarity: f64) -> bool {
        similarity >= self.candidate_similarity_threshold
    }

    /// Runner-up is far enough behind the winner
    pub fn are_distant_enough(&self, first: f64, second: Option<f64>) -> bool {
        match second {
            None => true,
            Some(second) => 1.0 - second >= (1.0 - first) * self.second_distance_gap_coefficient,
        }
    }

    /// Contents are close enough for one file to be the other one renamed
    pub fn are_files_similar(&self, similarity: f64) -> bool {
        similarity > self.file_similarity_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.9, None, true)]
    #[case(0.9, Some(0.8), true)]
    #[case(0.9, Some(0.86), false)]
    #[case(1.0, Some(1.0), true)]
    #[case(0.7, Some(0.6), false)]
    fn test_distance_rule(#[case] first: f64, #[case] second: Option<f64>, #[case] expected: bool) {
        assert_eq!(MarkupSettings::default().are_distant_enough(first, second), expected);
    }

    #[test]
    fn test_builders_override_defaults() {
        let settings = MarkupSettings::default()
            .with_parallel(false)
            .with_siblings(false)
            .with_candidate_similarity_threshold(0.8);

        assert!(!settings.parallel);
        assert!(!settings.use_siblings);
        assert!(!settings.is_similar_enough(0.7));
        assert_eq!(settings.ambiguity_top_count, 10);
    }

    #[rstest]
    #[case(0.61, true)]
    #[case(0.6, false)]
    #[case(0.0, false)]
    fn test_file_similarity_is_strict(#[case] similarity: f64, #[case] expected: bool) {
        assert_eq!(MarkupSettings::default().are_files_similar(similarity), expected);
    }
}
