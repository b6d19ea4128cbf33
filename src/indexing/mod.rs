//! Reindex lifecycle: wire types, the progress poller and the session that
//! ties a reindex request to its polling.

mod poller;
mod reindex;

pub use poller::{PollState, ReindexPoller, DEFAULT_POLL_INTERVAL};
pub use reindex::{ReindexPhase, ReindexSession};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /index/reindex`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_types: Option<Vec<String>>,
}

/// Server-side reindex status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReindexState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl ReindexState {
    /// Polling stops once one of these is seen
    pub fn is_terminal(self) -> bool {
        matches!(self, ReindexState::Completed | ReindexState::Failed)
    }
}

impl std::fmt::Display for ReindexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReindexState::Idle => "idle",
            ReindexState::Running => "running",
            ReindexState::Completed => "completed",
            ReindexState::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_entries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_entries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_indexed: Option<DateTime<Utc>>,
}

/// Reply of `/index/reindex` and `/index/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexStatus {
    pub success: bool,
    #[serde(default)]
    pub status: ReindexState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_stats: Option<IndexStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_api_key: Option<String>,
}

/// Reply of `GET /index/progress`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexProgress {
    pub status: ReindexState,
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_content_type: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Elapsed milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl ReindexProgress {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One entry to (re)index by reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub uid: String,
    pub content_type: String,
}

impl std::str::FromStr for BatchEntry {
    type Err = String;

    /// Parse `contentType:uid`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((content_type, uid)) if !content_type.is_empty() && !uid.is_empty() => {
                Ok(Self {
                    uid: uid.to_string(),
                    content_type: content_type.to_string(),
                })
            }
            _ => Err(format!("expected contentType:uid, got '{}'", s)),
        }
    }
}

/// Body of `POST /index/batch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchIndexParams {
    pub entries: Vec<BatchEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}
