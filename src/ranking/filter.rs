//! Threshold filtering over a candidate list

use crate::ranking::{passes_threshold, RankingConfig};
use crate::search::SearchResult;

/// Keep the candidates that pass the OR-combined threshold test.
///
/// Input order is preserved and the input slice is left untouched.
pub fn filter_results(results: &[SearchResult], config: &RankingConfig) -> Vec<SearchResult> {
    results
        .iter()
        .filter(|result| passes_threshold(result, config.min_similarity, config.min_rerank))
        .cloned()
        .collect()
}
