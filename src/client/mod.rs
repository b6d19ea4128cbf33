//! External search service: the traits the rest of the crate talks to, and
//! the reqwest implementation that speaks the service's JSON API.

mod http;
mod stack;

pub use http::HttpSearchClient;
pub use stack::{StackConfig, StackConfigLoader};

use crate::analytics::{SearchAnalytics, SearchStats};
use crate::error::Result;
use crate::indexing::{BatchIndexParams, ReindexParams, ReindexProgress, ReindexStatus};
use crate::search::{
    ContentType, HybridSearchParams, ImageSearchParams, ImageUpload, SearchResponse,
    TextSearchParams,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Search endpoints
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Plain text search
    async fn search_text(&self, params: &TextSearchParams) -> Result<SearchResponse>;

    /// Embedding search with reranking
    async fn search_semantic(&self, params: &TextSearchParams) -> Result<SearchResponse>;

    /// Image similarity search by URL
    async fn search_by_image(&self, params: &ImageSearchParams) -> Result<SearchResponse>;

    /// Image similarity search with uploaded bytes
    async fn search_by_upload(&self, upload: &ImageUpload, limit: usize)
        -> Result<SearchResponse>;

    /// Server-fused text + image search
    async fn search_hybrid(
        &self,
        params: &HybridSearchParams,
        upload: Option<&ImageUpload>,
    ) -> Result<SearchResponse>;
}

/// Index maintenance endpoints
#[async_trait]
pub trait IndexingBackend: Send + Sync {
    async fn start_reindex(&self, params: &ReindexParams) -> Result<ReindexStatus>;

    async fn get_reindex_progress(&self) -> Result<ReindexProgress>;

    async fn get_index_status(&self) -> Result<ReindexStatus>;

    async fn clear_index(&self) -> Result<Acknowledgement>;

    async fn batch_index(&self, params: &BatchIndexParams) -> Result<Acknowledgement>;
}

/// Read-only lookup and reporting endpoints
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn get_content_types(&self) -> Result<Vec<ContentType>>;

    async fn get_stack_config(&self) -> Result<StackConfig>;

    async fn get_analytics(&self, days: Option<u32>) -> Result<SearchAnalytics>;

    async fn get_stats(&self) -> Result<SearchStats>;
}

/// Generic `{ success, message }` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
