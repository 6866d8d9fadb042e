//! Relevance filter - threshold with top-N fallback
//!
//! Primary path keeps every candidate strictly above the threshold. When
//! nothing clears it, the best `fallback_count` candidates are kept instead
//! so that generation still has grounding material. Output is always
//! score-descending.

use crate::config::RagConfig;
use crate::search::Candidate;
use std::cmp::Ordering;

/// Candidates surviving the relevance policy, highest score first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredContext {
    pub candidates: Vec<Candidate>,

    /// Number of candidates the search returned
    pub retrieved: usize,

    /// True when the threshold was discarded in favour of the top-N fallback
    pub fallback: bool,
}

impl FilteredContext {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.id.clone()).collect()
    }
}

/// Threshold-with-fallback relevance policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevancePolicy {
    pub threshold: f32,
    pub fallback_count: usize,
}

impl Default for RelevancePolicy {
    fn default() -> Self {
        Self {
            threshold: 0.35,
            fallback_count: 2,
        }
    }
}

impl From<&RagConfig> for RelevancePolicy {
    fn from(config: &RagConfig) -> Self {
        Self {
            threshold: config.relevance_threshold,
            fallback_count: config.fallback_count,
        }
    }
}

impl RelevancePolicy {
    pub fn new(threshold: f32, fallback_count: usize) -> Self {
        Self { threshold, fallback_count }
    }

    /// Apply the policy to ranked search output
    pub fn apply(&self, ranked: Vec<Candidate>) -> FilteredContext {
        let retrieved = ranked.len();

        let mut kept: Vec<Candidate> = ranked
            .iter()
            .filter(|c| c.score > self.threshold)
            .cloned()
            .collect();

        let fallback = kept.is_empty() && !ranked.is_empty();
        if fallback {
            kept = ranked;
            kept.sort_by(by_score_desc);
            kept.truncate(self.fallback_count);
        } else {
            kept.sort_by(by_score_desc);
        }

        for (i, candidate) in kept.iter().enumerate() {
            tracing::debug!(
                rank = i + 1,
                id = %candidate.id,
                title = %candidate.metadata.title,
                client = %candidate.metadata.client,
                score = candidate.score,
                "Candidate kept"
            );
        }

        FilteredContext {
            candidates: kept,
            retrieved,
            fallback,
        }
    }
}

/// Descending by score, NaN last, ties keep their incoming order
fn by_score_desc(a: &Candidate, b: &Candidate) -> Ordering {
    match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.score.total_cmp(&a.score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::CaseMetadata;

    fn candidate(id: &str, score: f32) -> Candidate {
        Candidate {
            id: id.to_string(),
            score,
            metadata: CaseMetadata {
                title: format!("Case {}", id),
                ..CaseMetadata::default()
            },
        }
    }

    fn ids(ctx: &FilteredContext) -> Vec<&str> {
        ctx.candidates.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_threshold_keeps_only_scores_above() {
        let policy = RelevancePolicy::default();
        let ctx = policy.apply(vec![
            candidate("A", 0.52),
            candidate("B", 0.40),
            candidate("C", 0.10),
        ]);

        assert_eq!(ids(&ctx), vec!["A", "B"]);
        assert_eq!(ctx.retrieved, 3);
        assert!(!ctx.fallback);
    }

    #[test]
    fn test_fallback_to_top_two() {
        let policy = RelevancePolicy::default();
        let ctx = policy.apply(vec![candidate("A", 0.20), candidate("B", 0.10)]);

        assert_eq!(ids(&ctx), vec!["A", "B"]);
        assert!(ctx.fallback);
    }

    #[test]
    fn test_fallback_picks_highest_even_if_unsorted() {
        let policy = RelevancePolicy::default();
        let ctx = policy.apply(vec![
            candidate("low", 0.05),
            candidate("high", 0.30),
            candidate("mid", 0.20),
        ]);

        assert_eq!(ids(&ctx), vec!["high", "mid"]);
    }

    #[test]
    fn test_fallback_with_single_candidate() {
        let ctx = RelevancePolicy::default().apply(vec![candidate("only", -0.3)]);
        assert_eq!(ids(&ctx), vec!["only"]);
        assert!(ctx.fallback);
    }

    #[test]
    fn test_empty_input_stays_empty() {
        let ctx = RelevancePolicy::default().apply(Vec::new());
        assert!(ctx.is_empty());
        assert!(!ctx.fallback);
        assert_eq!(ctx.retrieved, 0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let ctx = RelevancePolicy::new(0.5, 2).apply(vec![
            candidate("edge", 0.5),
            candidate("above", 0.51),
        ]);
        assert_eq!(ids(&ctx), vec!["above"]);
    }

    #[test]
    fn test_primary_path_sorts_descending() {
        let ctx = RelevancePolicy::default().apply(vec![
            candidate("B", 0.40),
            candidate("skip", 0.1),
            candidate("A", 0.90),
            candidate("C", 0.36),
        ]);
        assert_eq!(ids(&ctx), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_nan_never_passes_and_sorts_last() {
        let ctx = RelevancePolicy::default().apply(vec![
            candidate("nan", f32::NAN),
            candidate("low", 0.1),
        ]);
        assert!(ctx.fallback);
        assert_eq!(ids(&ctx), vec!["low", "nan"]);
    }

    #[test]
    fn test_policy_from_config() {
        let config = RagConfig {
            relevance_threshold: 0.6,
            fallback_count: 1,
            ..RagConfig::default()
        };
        let policy = RelevancePolicy::from(&config);
        let ctx = policy.apply(vec![candidate("A", 0.5), candidate("B", 0.4)]);
        assert_eq!(ids(&ctx), vec!["A"]);
    }

    #[test]
    fn test_policy_over_score_lists() {
        // Every score list: either the strict-above subset, or the top two
        let lists: Vec<Vec<f32>> = vec![
            vec![0.9, 0.8, 0.7],
            vec![0.36, 0.35, 0.34],
            vec![0.35, 0.35],
            vec![-0.1, 0.0, 0.2, 0.1],
        ];

        for scores in lists {
            let ranked: Vec<Candidate> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| candidate(&i.to_string(), *s))
                .collect();
            let ctx = RelevancePolicy::default().apply(ranked);

            let mut above: Vec<f32> = scores.iter().copied().filter(|s| *s > 0.35).collect();
            above.sort_by(|a, b| b.total_cmp(a));
            let kept: Vec<f32> = ctx.candidates.iter().map(|c| c.score).collect();

            if above.is_empty() {
                let mut all = scores.clone();
                all.sort_by(|a, b| b.total_cmp(a));
                all.truncate(2);
                assert_eq!(kept, all);
            } else {
                assert_eq!(kept, above);
            }
        }
    }
}
