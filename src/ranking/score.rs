//! Threshold test and sort key for a single candidate

use crate::search::SearchResult;

/// Absent and non-finite scores both read as "no score"
fn usable(score: Option<f64>) -> Option<f64> {
    score.filter(|s| s.is_finite())
}

/// OR-combined threshold test.
///
/// A candidate passes when its similarity clears `min_similarity` or its
/// rerank score clears `min_rerank`. A missing score counts as `0.0`.
pub fn passes_threshold(result: &SearchResult, min_similarity: f64, min_rerank: f64) -> bool {
    let similarity = usable(result.similarity).unwrap_or(0.0);
    let rerank = usable(result.rerank_score).unwrap_or(0.0);

    similarity >= min_similarity || rerank >= min_rerank
}

/// Scalar used for ordering: fused score, else rerank score, else
/// similarity, else `0.0`.
///
/// Service results never carry a fused score, so for them this is the
/// rerank score with a similarity fallback.
pub fn comparable_score(result: &SearchResult) -> f64 {
    usable(result.fused_score)
        .or_else(|| usable(result.rerank_score))
        .or_else(|| usable(result.similarity))
        .unwrap_or(0.0)
}
