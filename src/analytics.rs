//! Read-only search analytics and service statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub days: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCounters {
    #[serde(default)]
    pub total_searches: u64,
    #[serde(default)]
    pub successful_searches: u64,
    /// Milliseconds
    #[serde(default)]
    pub average_response_time: f64,
    #[serde(default)]
    pub average_results_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCount {
    pub query: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorCount {
    pub error: String,
    pub count: u64,
}

/// Reply of `GET /search/analytics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalytics {
    pub period: AnalyticsPeriod,
    pub stats: SearchCounters,
    #[serde(default)]
    pub popular_queries: Vec<QueryCount>,
    #[serde(default)]
    pub error_stats: Vec<ErrorCount>,
}

impl SearchAnalytics {
    /// Share of successful searches in percent, `None` with no searches
    pub fn success_rate(&self) -> Option<f64> {
        if self.stats.total_searches == 0 {
            return None;
        }
        Some(100.0 * self.stats.successful_searches as f64 / self.stats.total_searches as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexCounters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_entries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_entries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_indexed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub text_search: bool,
    #[serde(default)]
    pub image_search: bool,
    #[serde(default)]
    pub hybrid_search: bool,
    #[serde(default)]
    pub upload_search: bool,
}

/// Reply of `GET /search/stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub success: bool,
    #[serde(default)]
    pub stats: IndexCounters,
    #[serde(default)]
    pub capabilities: Capabilities,
}
