//! Ordering of retained candidates

use crate::ranking::comparable_score;
use crate::search::SearchResult;

/// Sort descending by comparable score.
///
/// `sort_by` is a stable sort, so candidates with equal scores keep their
/// relative input order.
pub fn rank_results(results: &[SearchResult]) -> Vec<SearchResult> {
    let mut ranked = results.to_vec();
    ranked.sort_by(|a, b| comparable_score(b).total_cmp(&comparable_score(a)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.uid.as_str()).collect()
    }

    #[test]
    fn test_similarity_fallback_outranks_lower_rerank() {
        let results = vec![
            SearchResult::new("x").with_rerank_score(0.5),
            SearchResult::new("y").with_similarity(0.9),
        ];

        assert_eq!(uids(&rank_results(&results)), vec!["y", "x"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let results = vec![
            SearchResult::new("first").with_similarity(0.4),
            SearchResult::new("top").with_rerank_score(0.8),
            SearchResult::new("second").with_rerank_score(0.4),
            SearchResult::new("third").with_similarity(0.4),
        ];

        assert_eq!(
            uids(&rank_results(&results)),
            vec!["top", "first", "second", "third"]
        );
    }

    #[test]
    fn test_unscored_sink_to_bottom() {
        let results = vec![
            SearchResult::new("none"),
            SearchResult::new("negative").with_similarity(-0.1),
            SearchResult::new("some").with_similarity(0.1),
        ];

        assert_eq!(uids(&rank_results(&results)), vec!["some", "none", "negative"]);
    }

    #[test]
    fn test_identical_inputs_rank_identically() {
        let results: Vec<SearchResult> = (0..20)
            .map(|i| SearchResult::new(format!("r{}", i)).with_similarity((i % 4) as f64 / 4.0))
            .collect();

        assert_eq!(rank_results(&results), rank_results(&results));
    }
}
