use crate::client::CatalogBackend;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Identity of the content stack behind the search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackConfig {
    pub stack_api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Lazily fetches `/config/stack` once and keeps it for its own lifetime.
///
/// A failed fetch leaves the cell empty so the next `load` retries.
pub struct StackConfigLoader {
    backend: Arc<dyn CatalogBackend>,
    cell: OnceCell<StackConfig>,
}

impl StackConfigLoader {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            backend,
            cell: OnceCell::new(),
        }
    }

    pub async fn load(&self) -> Result<&StackConfig> {
        self.cell
            .get_or_try_init(|| async {
                tracing::debug!("Fetching stack configuration");
                self.backend.get_stack_config().await
            })
            .await
    }

    pub async fn stack_api_key(&self) -> Result<&str> {
        Ok(self.load().await?.stack_api_key.as_str())
    }

    /// Cached value without triggering a fetch
    pub fn cached(&self) -> Option<&StackConfig> {
        self.cell.get()
    }
}
