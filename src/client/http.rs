//! reqwest implementation of the search service API

use crate::analytics::{SearchAnalytics, SearchStats};
use crate::client::{Acknowledgement, CatalogBackend, IndexingBackend, SearchBackend, StackConfig};
use crate::config::BackendConfig;
use crate::error::{LensError, Result};
use crate::indexing::{BatchIndexParams, ReindexParams, ReindexProgress, ReindexStatus};
use crate::search::{
    ContentType, HybridSearchParams, ImageSearchParams, ImageUpload, SearchResponse,
    TextSearchParams,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentTypesEnvelope {
    content_types: Vec<ContentType>,
}

/// HTTP client for the search service
#[derive(Debug, Clone)]
pub struct HttpSearchClient {
    client: Client,
    base_url: String,
    environment: String,
}

impl HttpSearchClient {
    /// Build a client from the `[backend]` configuration section
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LensError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            environment: config.environment.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.client.get(self.url(path)).query(query);
        self.execute(path, request).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        self.execute(path, request).await
    }

    async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let request = self.client.post(self.url(path)).multipart(form);
        self.execute(path, request).await
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.client.delete(self.url(path));
        self.execute(path, request).await
    }

    /// Send with the `environment` parameter attached and decode the body.
    ///
    /// Non-2xx statuses become `HttpStatus`, bodies that do not decode become
    /// `InvalidResponse`.
    async fn execute<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .query(&[("environment", self.environment.as_str())])
            .send()
            .await
            .map_err(|source| {
                tracing::error!("Request to {} failed: {}", path, source);
                LensError::Transport {
                    endpoint: path.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body, status);

            match status {
                StatusCode::UNAUTHORIZED => {
                    tracing::warn!("Authentication failed. Please check your credentials.")
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    tracing::warn!("Rate limit exceeded. Please try again later.")
                }
                _ => {}
            }
            tracing::error!("Request to {} returned {}: {}", path, status, message);

            return Err(LensError::HttpStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(|source| LensError::Transport {
            endpoint: path.to_string(),
            source,
        })?;

        serde_json::from_slice(&bytes).map_err(|e| LensError::InvalidResponse {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn search<B>(&self, path: &str, body: &B) -> Result<SearchResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        ensure_success(path, self.post_json(path, body).await?)
    }
}

/// A 2xx reply can still carry `success: false`
fn ensure_success(path: &str, response: SearchResponse) -> Result<SearchResponse> {
    if !response.success {
        return Err(LensError::InvalidResponse {
            endpoint: path.to_string(),
            message: "service reported success: false".to_string(),
        });
    }
    Ok(response)
}

/// Prefer the service's `error` or `message` field over the raw body
fn error_message(body: &str, status: StatusCode) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = parsed.as_ref().and_then(|value| {
        value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    });

    field
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string())
}

fn image_part(upload: &ImageUpload) -> Result<Part> {
    Part::bytes(upload.bytes.clone())
        .file_name(upload.filename.clone())
        .mime_str(&upload.mime_type)
        .map_err(|e| LensError::InvalidQuery(format!("Invalid image MIME type: {}", e)))
}

fn json_field<T: Serialize>(value: &T, context: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| LensError::Json {
        source: e,
        context: context.to_string(),
    })
}

#[async_trait]
impl SearchBackend for HttpSearchClient {
    async fn search_text(&self, params: &TextSearchParams) -> Result<SearchResponse> {
        let path = "/search/text";
        self.search(path, params).await
    }

    async fn search_semantic(&self, params: &TextSearchParams) -> Result<SearchResponse> {
        let path = "/search/semantic";
        self.search(path, params).await
    }

    async fn search_by_image(&self, params: &ImageSearchParams) -> Result<SearchResponse> {
        let path = "/search/image";
        self.search(path, params).await
    }

    async fn search_by_upload(
        &self,
        upload: &ImageUpload,
        limit: usize,
    ) -> Result<SearchResponse> {
        let path = "/search/upload";
        let form = Form::new()
            .part("image", image_part(upload)?)
            .text("limit", limit.to_string());

        ensure_success(path, self.post_multipart(path, form).await?)
    }

    async fn search_hybrid(
        &self,
        params: &HybridSearchParams,
        upload: Option<&ImageUpload>,
    ) -> Result<SearchResponse> {
        let path = "/search/hybrid";

        let Some(upload) = upload else {
            return self.search(path, params).await;
        };

        let mut form = Form::new().part("image", image_part(upload)?);
        if let Some(text_query) = &params.text_query {
            form = form.text("textQuery", text_query.clone());
        }
        if let Some(limit) = params.limit {
            form = form.text("limit", limit.to_string());
        }
        if let Some(weights) = &params.weights {
            form = form.text("weights", json_field(weights, "Failed to encode weights")?);
        }
        if let Some(content_types) = &params.content_types {
            form = form.text(
                "contentTypes",
                json_field(content_types, "Failed to encode content types")?,
            );
        }

        ensure_success(path, self.post_multipart(path, form).await?)
    }
}

#[async_trait]
impl IndexingBackend for HttpSearchClient {
    async fn start_reindex(&self, params: &ReindexParams) -> Result<ReindexStatus> {
        self.post_json("/index/reindex", params).await
    }

    async fn get_reindex_progress(&self) -> Result<ReindexProgress> {
        self.get_json("/index/progress", &[]).await
    }

    async fn get_index_status(&self) -> Result<ReindexStatus> {
        self.get_json("/index/status", &[]).await
    }

    async fn clear_index(&self) -> Result<Acknowledgement> {
        self.delete_json("/index/clear").await
    }

    async fn batch_index(&self, params: &BatchIndexParams) -> Result<Acknowledgement> {
        self.post_json("/index/batch", params).await
    }
}

#[async_trait]
impl CatalogBackend for HttpSearchClient {
    async fn get_content_types(&self) -> Result<Vec<ContentType>> {
        let envelope: ContentTypesEnvelope = self.get_json("/config/content-types", &[]).await?;
        Ok(envelope.content_types)
    }

    async fn get_stack_config(&self) -> Result<StackConfig> {
        self.get_json("/config/stack", &[]).await
    }

    async fn get_analytics(&self, days: Option<u32>) -> Result<SearchAnalytics> {
        let query: Vec<(&str, String)> = days
            .map(|d| vec![("days", d.to_string())])
            .unwrap_or_default();
        self.get_json("/search/analytics", &query).await
    }

    async fn get_stats(&self) -> Result<SearchStats> {
        let stats: SearchStats = self.get_json("/search/stats", &[]).await?;
        if !stats.success {
            return Err(LensError::InvalidResponse {
                endpoint: "/search/stats".to_string(),
                message: "service reported success: false".to_string(),
            });
        }
        Ok(stats)
    }
}
