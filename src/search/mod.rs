//! Search requests, the orchestrator that runs them against the search
//! service, and the per-slot session that keeps only the latest answer.

mod orchestrator;
mod session;
mod types;
pub mod validation;

pub use orchestrator::SearchOrchestrator;
pub use session::{SearchOutcome, SearchSession, SearchState};
pub use types::{
    content_type_display_name, ContentType, FieldSchema, HybridSearchParams, ImageSearchParams,
    ImageUpload, ResponseMetadata, SearchResponse, SearchResult, SearchType, TextSearchParams,
    TextStrategy, UploadedImage,
};

use crate::error::{LensError, Result};
use crate::ranking::{FusionKey, FusionWeights, PostFusionFilter, RankingConfig};
use serde::{Deserialize, Serialize};

/// Default number of candidates requested from the service per modality
pub const DEFAULT_REQUEST_LIMIT: usize = 20;

/// Input channel of a search request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Text,
    Image,
    Hybrid,
}

/// Where hybrid fusion happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HybridStrategy {
    /// Query text and image endpoints concurrently and fuse locally
    #[default]
    #[serde(rename = "client")]
    ClientFusion,
    /// Use the service's `/search/hybrid` endpoint and only consolidate
    #[serde(rename = "server")]
    Server,
}

/// Query image reference
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Url(String),
    File(ImageUpload),
}

/// Hybrid-only settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HybridOptions {
    pub weights: FusionWeights,
    pub strategy: HybridStrategy,
    pub fusion_key: FusionKey,
    pub post_fusion: PostFusionFilter,
}

/// A complete search invocation
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub mode: SearchMode,
    pub query: Option<String>,
    pub image: Option<ImageSource>,
    pub content_types: Vec<String>,
    pub text_strategy: TextStrategy,
    pub ranking: RankingConfig,
    pub hybrid: HybridOptions,
    /// Candidates requested from the service per call
    pub request_limit: usize,
}

impl SearchRequest {
    fn base(mode: SearchMode) -> Self {
        Self {
            mode,
            query: None,
            image: None,
            content_types: Vec::new(),
            text_strategy: TextStrategy::default(),
            ranking: RankingConfig::for_mode(mode),
            hybrid: HybridOptions::default(),
            request_limit: DEFAULT_REQUEST_LIMIT,
        }
    }

    /// Text query with default ranking for text mode
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::base(SearchMode::Text)
        }
    }

    /// Image query with default ranking for image mode
    pub fn image(image: ImageSource) -> Self {
        Self {
            image: Some(image),
            ..Self::base(SearchMode::Image)
        }
    }

    /// Hybrid query; either side may be absent but not both
    pub fn hybrid(query: Option<String>, image: Option<ImageSource>) -> Self {
        Self {
            query,
            image,
            ..Self::base(SearchMode::Hybrid)
        }
    }

    pub fn with_ranking(mut self, ranking: RankingConfig) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_hybrid(mut self, hybrid: HybridOptions) -> Self {
        self.hybrid = hybrid;
        self
    }

    pub fn with_content_types(mut self, content_types: Vec<String>) -> Self {
        self.content_types = content_types;
        self
    }

    pub fn with_text_strategy(mut self, strategy: TextStrategy) -> Self {
        self.text_strategy = strategy;
        self
    }

    pub fn with_request_limit(mut self, limit: usize) -> Self {
        self.request_limit = limit;
        self
    }

    /// Trimmed query text, if any
    pub fn query_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Content type filter, omitted when empty
    pub fn content_type_filter(&self) -> Option<Vec<String>> {
        if self.content_types.is_empty() {
            None
        } else {
            Some(self.content_types.clone())
        }
    }

    /// Check configuration and inputs before anything is sent
    pub fn validate(&self) -> Result<()> {
        self.ranking.validate()?;

        if self.request_limit == 0 {
            return Err(LensError::InvalidConfiguration(
                "request limit must be greater than 0".to_string(),
            ));
        }

        match self.mode {
            SearchMode::Text => {
                let query = self.query.as_deref().unwrap_or_default();
                validation::validate_search_query(query)?;
            }
            SearchMode::Image => {
                let image = self.image.as_ref().ok_or_else(|| {
                    LensError::InvalidQuery("Image search requires an image".to_string())
                })?;
                validate_image(image)?;
            }
            SearchMode::Hybrid => {
                self.hybrid.weights.validate()?;
                if let PostFusionFilter::Combined { min_score } = self.hybrid.post_fusion {
                    if !min_score.is_finite() {
                        return Err(LensError::InvalidConfiguration(format!(
                            "combined fusion threshold must be finite, got {}",
                            min_score
                        )));
                    }
                }

                if self.query_text().is_none() && self.image.is_none() {
                    return Err(LensError::InvalidQuery(
                        "Hybrid search requires a text query, an image, or both".to_string(),
                    ));
                }
                if let Some(query) = self.query_text() {
                    validation::validate_search_query(query)?;
                }
                if let Some(image) = &self.image {
                    validate_image(image)?;
                }
            }
        }

        Ok(())
    }
}

fn validate_image(image: &ImageSource) -> Result<()> {
    match image {
        ImageSource::Url(url) => validation::validate_image_url(url),
        ImageSource::File(upload) => validation::validate_image_upload(upload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_pick_mode_caps() {
        assert_eq!(SearchRequest::text("hello").ranking.max_results, 5);
        let image = SearchRequest::image(ImageSource::Url("https://x.io/a.png".to_string()));
        assert_eq!(image.ranking.max_results, 12);
        assert_eq!(image.request_limit, DEFAULT_REQUEST_LIMIT);
    }

    #[test]
    fn test_text_requires_valid_query() {
        assert!(SearchRequest::text("hello").validate().is_ok());
        assert!(SearchRequest::text(" ").validate().is_err());
    }

    #[test]
    fn test_hybrid_requires_some_input() {
        let empty = SearchRequest::hybrid(Some("   ".to_string()), None);
        assert!(matches!(empty.validate(), Err(LensError::InvalidQuery(_))));

        let text_only = SearchRequest::hybrid(Some("red shoes".to_string()), None);
        assert!(text_only.validate().is_ok());
    }

    #[test]
    fn test_hybrid_rejects_bad_weights() {
        let mut request = SearchRequest::hybrid(
            Some("red shoes".to_string()),
            Some(ImageSource::Url("https://x.io/a.png".to_string())),
        );
        request.hybrid.weights = FusionWeights {
            text: 0.8,
            image: 0.8,
        };

        assert!(matches!(
            request.validate(),
            Err(LensError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let request =
            SearchRequest::text("hello").with_ranking(RankingConfig::new(0.2, 0.003, 0));
        assert!(matches!(
            request.validate(),
            Err(LensError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_empty_content_types_are_omitted() {
        let request = SearchRequest::text("hello");
        assert!(request.content_type_filter().is_none());

        let filtered = request.with_content_types(vec!["article".to_string()]);
        assert_eq!(filtered.content_type_filter(), Some(vec!["article".to_string()]));
    }
}
