//! Wire types exchanged with the search service

use crate::error::{LensError, Result};
use crate::ranking::FusionWeights;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One scored candidate returned by the search service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Stable entry identifier, unique within one response
    pub uid: String,

    /// Content type label (text modality only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Embedding similarity, higher is more similar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,

    /// Cross-encoder rerank score, preferred over similarity when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,

    /// Weighted score assigned by hybrid fusion. Never sent by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fused_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    /// Any other attribute, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchResult {
    /// Create a result carrying only an identifier
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn with_rerank_score(mut self, rerank_score: f64) -> Self {
        self.rerank_score = Some(rerank_score);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Modality tag reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Text,
    Semantic,
    Image,
    UploadedImage,
    Hybrid,
}

/// Optional timing and provenance metadata on a search response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(default)]
    pub total_results: Option<usize>,
    /// Server-side elapsed time in milliseconds
    #[serde(default)]
    pub search_time: Option<f64>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub reranked: Option<bool>,
}

/// Echo of an uploaded query image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub filename: String,
    pub size: u64,
    pub mimetype: String,
}

/// Envelope returned by every search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    pub results: Vec<SearchResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<FusionWeights>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_image: Option<UploadedImage>,
}

impl SearchResponse {
    /// Build a successful response around a result list
    pub fn ok(results: Vec<SearchResult>, search_type: SearchType) -> Self {
        Self {
            success: true,
            query: None,
            image_url: None,
            count: Some(results.len()),
            results,
            search_type: Some(search_type),
            metadata: None,
            weights: None,
            uploaded_image: None,
        }
    }

    /// Reject `success: false`, otherwise hand back the raw candidates
    pub fn into_results(self, endpoint: &str) -> Result<Vec<SearchResult>> {
        if !self.success {
            return Err(LensError::InvalidResponse {
                endpoint: endpoint.to_string(),
                message: "service reported success: false".to_string(),
            });
        }
        Ok(self.results)
    }
}

/// Which backend ranking strategy a text query uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStrategy {
    /// Embedding search with reranking (`/search/semantic`)
    #[default]
    Semantic,
    /// Plain text search (`/search/text`)
    Text,
}

/// Body of `/search/text` and `/search/semantic`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSearchParams {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_type: Option<TextStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Body of `/search/image`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSearchParams {
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Body of `/search/hybrid`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<FusionWeights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// Image bytes sent as a multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, inferring its MIME type from the extension
    pub async fn from_path(path: &std::path::Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| LensError::Io {
            source: e,
            context: format!("Failed to read image file: {:?}", path),
        })?;

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();

        let mime_type = super::validation::mime_type_for(&filename)
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(Self {
            filename,
            mime_type,
            bytes,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Schema field of a content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub uid: String,
    pub data_type: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<bool>,
}

/// Content type used to label and filter results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    pub uid: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub schema: Vec<FieldSchema>,
}

/// Display name for a content type uid, falling back to the uid itself
pub fn content_type_display_name<'a>(uid: &'a str, content_types: &'a [ContentType]) -> &'a str {
    content_types
        .iter()
        .find(|ct| ct.uid == uid)
        .map(|ct| ct.title.as_str())
        .unwrap_or(uid)
}
