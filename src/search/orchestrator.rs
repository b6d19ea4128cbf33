//! Dispatches a search request to the service and consolidates the answer

use crate::client::SearchBackend;
use crate::error::Result;
use crate::ranking::{consolidate, consolidate_hybrid};
use crate::search::{
    HybridSearchParams, HybridStrategy, ImageSearchParams, ImageSource, SearchMode, SearchRequest,
    SearchResult, TextSearchParams, TextStrategy,
};
use std::sync::Arc;

/// Runs searches against a [`SearchBackend`] and returns presentation-ready lists
#[derive(Clone)]
pub struct SearchOrchestrator {
    backend: Arc<dyn SearchBackend>,
}

impl SearchOrchestrator {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Validate, dispatch and consolidate.
    ///
    /// Configuration and input problems are rejected before any request is
    /// sent. Service failures propagate unchanged and never yield partial
    /// results.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        request.validate()?;

        tracing::debug!(
            "Dispatching {:?} search (limit {}, cap {})",
            request.mode,
            request.request_limit,
            request.ranking.max_results
        );

        match request.mode {
            SearchMode::Text => {
                let raw = self.fetch_text(request).await?;
                Ok(consolidate(&raw, &request.ranking))
            }
            SearchMode::Image => {
                let raw = self.fetch_image(request).await?;
                Ok(consolidate(&raw, &request.ranking))
            }
            SearchMode::Hybrid => match request.hybrid.strategy {
                HybridStrategy::ClientFusion => self.search_hybrid_locally(request).await,
                HybridStrategy::Server => self.search_hybrid_on_server(request).await,
            },
        }
    }

    /// Text and image calls run concurrently; both must succeed
    async fn search_hybrid_locally(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let (text_raw, image_raw) =
            tokio::join!(self.fetch_text(request), self.fetch_image(request));

        let text_raw = text_raw?;
        let image_raw = image_raw?;

        Ok(consolidate_hybrid(
            &text_raw,
            &image_raw,
            &request.hybrid.weights,
            request.hybrid.fusion_key,
            &request.hybrid.post_fusion,
            &request.ranking,
        ))
    }

    async fn search_hybrid_on_server(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<SearchResult>> {
        let (image_url, upload) = match &request.image {
            Some(ImageSource::Url(url)) => (Some(url.trim().to_string()), None),
            Some(ImageSource::File(upload)) => (None, Some(upload)),
            None => (None, None),
        };

        let params = HybridSearchParams {
            text_query: request.query_text().map(str::to_string),
            image_url,
            limit: Some(request.request_limit),
            content_types: request.content_type_filter(),
            weights: Some(request.hybrid.weights),
            threshold: None,
        };

        let raw = self
            .backend
            .search_hybrid(&params, upload)
            .await?
            .into_results("/search/hybrid")?;

        Ok(consolidate(&raw, &request.ranking))
    }

    /// Raw text candidates, empty when the request has no text side
    async fn fetch_text(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let Some(query) = request.query_text() else {
            return Ok(Vec::new());
        };

        let params = TextSearchParams {
            query: query.to_string(),
            limit: Some(request.request_limit),
            search_type: Some(request.text_strategy),
            content_types: request.content_type_filter(),
            threshold: None,
        };

        let (response, endpoint) = match request.text_strategy {
            TextStrategy::Semantic => (
                self.backend.search_semantic(&params).await?,
                "/search/semantic",
            ),
            TextStrategy::Text => (self.backend.search_text(&params).await?, "/search/text"),
        };

        let results = response.into_results(endpoint)?;
        tracing::debug!("{} returned {} candidates", endpoint, results.len());
        Ok(results)
    }

    /// Raw image candidates, empty when the request has no image side
    async fn fetch_image(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let results = match &request.image {
            None => return Ok(Vec::new()),
            Some(ImageSource::Url(url)) => {
                let params = ImageSearchParams {
                    image_url: url.trim().to_string(),
                    limit: Some(request.request_limit),
                    threshold: None,
                };
                self.backend
                    .search_by_image(&params)
                    .await?
                    .into_results("/search/image")?
            }
            Some(ImageSource::File(upload)) => self
                .backend
                .search_by_upload(upload, request.request_limit)
                .await?
                .into_results("/search/upload")?,
        };

        tracing::debug!("Image search returned {} candidates", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LensError;
    use crate::ranking::{FusionWeights, PostFusionFilter};
    use crate::search::{ImageUpload, SearchResponse, SearchType};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CannedBackend {
        text: Vec<SearchResult>,
        image: Vec<SearchResult>,
        fail_image: bool,
        unsuccessful: bool,
        calls: Mutex<Vec<String>>,
    }

    impl CannedBackend {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn respond(&self, results: &[SearchResult], search_type: SearchType) -> SearchResponse {
            let mut response = SearchResponse::ok(results.to_vec(), search_type);
            response.success = !self.unsuccessful;
            response
        }
    }

    #[async_trait]
    impl SearchBackend for CannedBackend {
        async fn search_text(&self, params: &TextSearchParams) -> Result<SearchResponse> {
            self.record(format!("text:{}", params.query));
            Ok(self.respond(&self.text, SearchType::Text))
        }

        async fn search_semantic(&self, params: &TextSearchParams) -> Result<SearchResponse> {
            self.record(format!("semantic:{}", params.query));
            Ok(self.respond(&self.text, SearchType::Semantic))
        }

        async fn search_by_image(&self, params: &ImageSearchParams) -> Result<SearchResponse> {
            self.record(format!("image:{}", params.image_url));
            if self.fail_image {
                return Err(LensError::HttpStatus {
                    endpoint: "/search/image".to_string(),
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(self.respond(&self.image, SearchType::Image))
        }

        async fn search_by_upload(
            &self,
            upload: &ImageUpload,
            _limit: usize,
        ) -> Result<SearchResponse> {
            self.record(format!("upload:{}", upload.filename));
            Ok(self.respond(&self.image, SearchType::UploadedImage))
        }

        async fn search_hybrid(
            &self,
            params: &HybridSearchParams,
            _upload: Option<&ImageUpload>,
        ) -> Result<SearchResponse> {
            self.record(format!(
                "hybrid:{}",
                params.text_query.clone().unwrap_or_default()
            ));
            Ok(self.respond(&self.text, SearchType::Hybrid))
        }
    }

    fn uids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.uid.as_str()).collect()
    }

    fn image_url() -> ImageSource {
        ImageSource::Url("https://cdn.example.com/query.png".to_string())
    }

    #[tokio::test]
    async fn test_text_search_consolidates() {
        let backend = Arc::new(CannedBackend {
            text: (1..=8)
                .map(|i| SearchResult::new(format!("t{}", i)).with_similarity(i as f64 / 10.0))
                .collect(),
            ..Default::default()
        });
        let orchestrator = SearchOrchestrator::new(backend.clone());

        let results = orchestrator
            .search(&SearchRequest::text("  blue whale  "))
            .await
            .unwrap();

        // t1 fails the 0.2 similarity cut; cap of 5 keeps the top five
        assert_eq!(uids(&results), vec!["t8", "t7", "t6", "t5", "t4"]);
        assert_eq!(backend.calls(), vec!["semantic:blue whale"]);
    }

    #[tokio::test]
    async fn test_exact_text_strategy_uses_text_endpoint() {
        let backend = Arc::new(CannedBackend::default());
        let orchestrator = SearchOrchestrator::new(backend.clone());

        let request = SearchRequest::text("blue whale").with_text_strategy(TextStrategy::Text);
        assert!(orchestrator.search(&request).await.unwrap().is_empty());
        assert_eq!(backend.calls(), vec!["text:blue whale"]);
    }

    #[tokio::test]
    async fn test_image_search_uses_image_cap() {
        let backend = Arc::new(CannedBackend {
            image: (0..20)
                .map(|i| SearchResult::new(format!("i{}", i)).with_similarity(0.5))
                .collect(),
            ..Default::default()
        });
        let orchestrator = SearchOrchestrator::new(backend);

        let results = orchestrator
            .search(&SearchRequest::image(image_url()))
            .await
            .unwrap();

        assert_eq!(results.len(), 12);
        assert_eq!(results[0].uid, "i0");
        assert_eq!(results[11].uid, "i11");
    }

    #[tokio::test]
    async fn test_upload_goes_to_upload_endpoint() {
        let backend = Arc::new(CannedBackend::default());
        let orchestrator = SearchOrchestrator::new(backend.clone());

        let upload = ImageUpload::new("query.png", "image/png", vec![1, 2, 3]);
        orchestrator
            .search(&SearchRequest::image(ImageSource::File(upload)))
            .await
            .unwrap();

        assert_eq!(backend.calls(), vec!["upload:query.png"]);
    }

    #[tokio::test]
    async fn test_client_side_hybrid_fuses_both_channels() {
        let backend = Arc::new(CannedBackend {
            text: vec![
                SearchResult::new("both").with_similarity(0.6),
                SearchResult::new("text-only").with_similarity(0.9),
            ],
            image: vec![
                SearchResult::new("both").with_similarity(0.8),
                SearchResult::new("image-only").with_similarity(0.9),
            ],
            ..Default::default()
        });
        let orchestrator = SearchOrchestrator::new(backend.clone());

        let request = SearchRequest::hybrid(Some("red shoes".to_string()), Some(image_url()));
        let results = orchestrator.search(&request).await.unwrap();

        // both = 0.7*0.6 + 0.3*0.8 = 0.66, text-only = 0.63, image-only = 0.27
        assert_eq!(uids(&results), vec!["both", "text-only", "image-only"]);
        assert!(results.iter().all(|r| r.fused_score.is_some()));

        let mut calls = backend.calls();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                "image:https://cdn.example.com/query.png",
                "semantic:red shoes"
            ]
        );
    }

    #[tokio::test]
    async fn test_client_side_hybrid_filters_each_channel_first() {
        let backend = Arc::new(CannedBackend {
            text: vec![
                SearchResult::new("weak").with_similarity(0.15),
                SearchResult::new("strong").with_similarity(0.8),
            ],
            image: vec![
                SearchResult::new("weak").with_similarity(0.15),
                SearchResult::new("strong").with_similarity(0.1),
            ],
            ..Default::default()
        });
        let orchestrator = SearchOrchestrator::new(backend);

        let request = SearchRequest::hybrid(Some("red shoes".to_string()), Some(image_url()));
        let results = orchestrator.search(&request).await.unwrap();

        // weak fails both axes; strong keeps only its text contribution
        assert_eq!(uids(&results), vec!["strong"]);
        assert!((results[0].fused_score.unwrap() - 0.56).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_hybrid_fails_when_one_side_fails() {
        let backend = Arc::new(CannedBackend {
            text: vec![SearchResult::new("a").with_similarity(0.9)],
            fail_image: true,
            ..Default::default()
        });
        let orchestrator = SearchOrchestrator::new(backend);

        let request = SearchRequest::hybrid(Some("red shoes".to_string()), Some(image_url()));
        let err = orchestrator.search(&request).await.unwrap_err();
        assert!(err.is_request_failure());
    }

    #[tokio::test]
    async fn test_hybrid_text_only_still_weighted() {
        let backend = Arc::new(CannedBackend {
            text: vec![SearchResult::new("p").with_similarity(0.8)],
            ..Default::default()
        });
        let orchestrator = SearchOrchestrator::new(backend.clone());

        let request = SearchRequest::hybrid(Some("red shoes".to_string()), None);
        let results = orchestrator.search(&request).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!((results[0].fused_score.unwrap() - 0.56).abs() < 1e-9);
        assert_eq!(backend.calls(), vec!["semantic:red shoes"]);
    }

    #[tokio::test]
    async fn test_server_hybrid_strategy() {
        let backend = Arc::new(CannedBackend {
            text: vec![
                SearchResult::new("keep").with_similarity(0.3),
                SearchResult::new("drop").with_similarity(0.1),
            ],
            ..Default::default()
        });
        let orchestrator = SearchOrchestrator::new(backend.clone());

        let mut request = SearchRequest::hybrid(Some("red shoes".to_string()), Some(image_url()));
        request.hybrid.strategy = HybridStrategy::Server;
        request.hybrid.post_fusion = PostFusionFilter::Disabled;

        let results = orchestrator.search(&request).await.unwrap();
        assert_eq!(uids(&results), vec!["keep"]);
        assert_eq!(backend.calls(), vec!["hybrid:red shoes"]);
    }

    #[tokio::test]
    async fn test_invalid_weights_rejected_before_dispatch() {
        let backend = Arc::new(CannedBackend::default());
        let orchestrator = SearchOrchestrator::new(backend.clone());

        let mut request = SearchRequest::hybrid(Some("red shoes".to_string()), Some(image_url()));
        request.hybrid.weights = FusionWeights {
            text: 0.5,
            image: 0.2,
        };

        let err = orchestrator.search(&request).await.unwrap_err();
        assert!(matches!(err, LensError::InvalidConfiguration(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_an_error() {
        let backend = Arc::new(CannedBackend {
            text: vec![SearchResult::new("a").with_similarity(0.9)],
            unsuccessful: true,
            ..Default::default()
        });
        let orchestrator = SearchOrchestrator::new(backend);

        let err = orchestrator
            .search(&SearchRequest::text("blue whale"))
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::InvalidResponse { .. }));
    }
}
