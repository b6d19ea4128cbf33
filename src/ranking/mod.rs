//! Result consolidation: threshold filtering, hybrid fusion, ranking and
//! truncation of scored candidates.
//!
//! Every stage is a pure function over borrowed input. None of them fail on
//! empty lists or missing scores; an absent score always reads as `0.0`.

mod filter;
mod fusion;
mod limiter;
mod ranker;
mod score;

pub use filter::filter_results;
pub use fusion::{
    apply_post_fusion_filter, fuse, FusionKey, FusionWeights, PostFusionFilter,
    DEFAULT_MIN_FUSED_SCORE, WEIGHT_TOLERANCE,
};
pub use limiter::limit_results;
pub use ranker::rank_results;
pub use score::{comparable_score, passes_threshold};

use crate::error::{LensError, Result};
use crate::search::{SearchMode, SearchResult};
use serde::{Deserialize, Serialize};

/// Default similarity threshold
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.2;

/// Default rerank threshold
pub const DEFAULT_MIN_RERANK: f64 = 0.003;

/// Result cap for text and hybrid searches
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Result cap for pure image searches
pub const IMAGE_MAX_RESULTS: usize = 12;

/// Thresholds and cap for one search invocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub min_similarity: f64,
    pub min_rerank: f64,
    pub max_results: usize,
}

impl RankingConfig {
    pub fn new(min_similarity: f64, min_rerank: f64, max_results: usize) -> Self {
        Self {
            min_similarity,
            min_rerank,
            max_results,
        }
    }

    /// Default thresholds with the cap for the given modality
    pub fn for_mode(mode: SearchMode) -> Self {
        let max_results = match mode {
            SearchMode::Image => IMAGE_MAX_RESULTS,
            SearchMode::Text | SearchMode::Hybrid => DEFAULT_MAX_RESULTS,
        };
        Self::new(DEFAULT_MIN_SIMILARITY, DEFAULT_MIN_RERANK, max_results)
    }

    /// Finite thresholds and a positive cap
    pub fn validate(&self) -> Result<()> {
        if !self.min_similarity.is_finite() {
            return Err(LensError::InvalidConfiguration(format!(
                "min_similarity must be a finite number, got {}",
                self.min_similarity
            )));
        }
        if !self.min_rerank.is_finite() {
            return Err(LensError::InvalidConfiguration(format!(
                "min_rerank must be a finite number, got {}",
                self.min_rerank
            )));
        }
        if self.max_results == 0 {
            return Err(LensError::InvalidConfiguration(
                "max_results must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self::for_mode(SearchMode::Text)
    }
}

/// Filter, rank and limit a single-modality candidate list
pub fn consolidate(results: &[SearchResult], config: &RankingConfig) -> Vec<SearchResult> {
    let filtered = filter_results(results, config);
    let ranked = rank_results(&filtered);
    let limited = limit_results(&ranked, config.max_results);

    tracing::debug!(
        "Consolidated {} candidates: {} passed thresholds, {} returned",
        results.len(),
        filtered.len(),
        limited.len()
    );

    limited
}

/// Filter each modality, fuse the survivors, then apply the post-fusion rule,
/// rank and limit.
///
/// A candidate dropped by its own modality's thresholds contributes nothing to
/// the fused score, so a record failing both axes never reaches the output.
pub fn consolidate_hybrid(
    text_results: &[SearchResult],
    image_results: &[SearchResult],
    weights: &FusionWeights,
    key: FusionKey,
    rule: &PostFusionFilter,
    config: &RankingConfig,
) -> Vec<SearchResult> {
    let text_passed = filter_results(text_results, config);
    let image_passed = filter_results(image_results, config);
    let fused = fuse(&text_passed, &image_passed, weights, key);
    let filtered = apply_post_fusion_filter(&fused, rule, config);
    let ranked = rank_results(&filtered);
    let limited = limit_results(&ranked, config.max_results);

    tracing::debug!(
        "Consolidated {} text and {} image candidates: {} fused, {} passed {:?}, {} returned",
        text_results.len(),
        image_results.len(),
        fused.len(),
        filtered.len(),
        rule,
        limited.len()
    );

    limited
}
