//! Configuration management for content-lens
//!
//! Loads the TOML config file, applies a named profile and
//! `CONTENT_LENS_SECTION__KEY` environment overrides, then validates the
//! result. Per-search settings are derived from here; nothing in the ranking
//! core reads configuration on its own.

use crate::error::{LensError, Result};
use crate::ranking::{
    FusionKey, FusionWeights, PostFusionFilter, RankingConfig, DEFAULT_MAX_RESULTS,
    DEFAULT_MIN_FUSED_SCORE, DEFAULT_MIN_RERANK, DEFAULT_MIN_SIMILARITY, IMAGE_MAX_RESULTS,
};
use crate::search::{HybridOptions, HybridStrategy, SearchMode, DEFAULT_REQUEST_LIMIT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

const ENV_PREFIX: &str = "CONTENT_LENS_";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ranking: RankingSection,
    #[serde(default)]
    pub hybrid: HybridSection,
    #[serde(default)]
    pub indexing: IndexingSection,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Search service connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Sent as the `environment` query parameter on every request
    pub environment: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            environment: "development".to_string(),
        }
    }
}

/// Thresholds and caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSection {
    pub min_similarity: f64,
    pub min_rerank: f64,
    pub max_results_text: usize,
    pub max_results_image: usize,
    pub max_results_hybrid: usize,
    /// Candidates requested from the service per call
    pub request_limit: usize,
}

impl Default for RankingSection {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            min_rerank: DEFAULT_MIN_RERANK,
            max_results_text: DEFAULT_MAX_RESULTS,
            max_results_image: IMAGE_MAX_RESULTS,
            max_results_hybrid: DEFAULT_MAX_RESULTS,
            request_limit: DEFAULT_REQUEST_LIMIT,
        }
    }
}

/// How fused hybrid results are thresholded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostFusionRule {
    #[default]
    Combined,
    PerAxis,
    Disabled,
}

/// Hybrid fusion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSection {
    pub text_weight: f64,
    pub image_weight: f64,
    pub strategy: HybridStrategy,
    pub fusion_key: FusionKey,
    pub post_fusion: PostFusionRule,
    /// Threshold for the `combined` rule
    pub min_fused_score: f64,
}

impl Default for HybridSection {
    fn default() -> Self {
        let weights = FusionWeights::default();
        Self {
            text_weight: weights.text,
            image_weight: weights.image,
            strategy: HybridStrategy::default(),
            fusion_key: FusionKey::default(),
            post_fusion: PostFusionRule::default(),
            min_fused_score: DEFAULT_MIN_FUSED_SCORE,
        }
    }
}

/// Reindex settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingSection {
    pub poll_interval_ms: u64,
    pub batch_size: usize,
}

impl Default for IndexingSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            batch_size: 50,
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rerank: Option<f64>,
    /// Image weight follows as `1 - text_weight`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<HybridStrategy>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load configuration with a specific profile applied before env overrides
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_profile(profile)?;
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LensError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| LensError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| LensError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| LensError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(base_url) = overrides.base_url {
            self.backend.base_url = base_url;
        }
        if let Some(environment) = overrides.environment {
            self.backend.environment = environment;
        }
        if let Some(min_similarity) = overrides.min_similarity {
            self.ranking.min_similarity = min_similarity;
        }
        if let Some(min_rerank) = overrides.min_rerank {
            self.ranking.min_rerank = min_rerank;
        }
        if let Some(text_weight) = overrides.text_weight {
            self.set_text_weight(text_weight);
        }
        if let Some(strategy) = overrides.strategy {
            self.hybrid.strategy = strategy;
        }

        tracing::debug!("Applied profile '{}'", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: CONTENT_LENS_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(std::env::vars());
    }

    /// Apply overrides from arbitrary key/value pairs; keys without the
    /// `CONTENT_LENS_` prefix are ignored
    pub fn apply_overrides_from<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "BACKEND__BASE_URL" => self.backend.base_url = value.to_string(),
            "BACKEND__ENVIRONMENT" => self.backend.environment = value.to_string(),
            "BACKEND__TIMEOUT_SECS" => self.backend.timeout_secs = parse_value(path, value)?,
            "RANKING__MIN_SIMILARITY" => self.ranking.min_similarity = parse_value(path, value)?,
            "RANKING__MIN_RERANK" => self.ranking.min_rerank = parse_value(path, value)?,
            "RANKING__REQUEST_LIMIT" => self.ranking.request_limit = parse_value(path, value)?,
            "HYBRID__TEXT_WEIGHT" => {
                let text_weight = parse_value(path, value)?;
                self.set_text_weight(text_weight);
            }
            "HYBRID__STRATEGY" => {
                self.hybrid.strategy = match value {
                    "client" => HybridStrategy::ClientFusion,
                    "server" => HybridStrategy::Server,
                    _ => {
                        return Err(LensError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!("Expected 'client' or 'server', got '{}'", value),
                        })
                    }
                };
            }
            "INDEXING__POLL_INTERVAL_MS" => {
                self.indexing.poll_interval_ms = parse_value(path, value)?
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    fn set_text_weight(&mut self, text_weight: f64) {
        self.hybrid.text_weight = text_weight;
        self.hybrid.image_weight = 1.0 - text_weight;
    }

    /// Thresholds and cap for a search mode
    pub fn ranking_for(&self, mode: SearchMode) -> RankingConfig {
        let max_results = match mode {
            SearchMode::Text => self.ranking.max_results_text,
            SearchMode::Image => self.ranking.max_results_image,
            SearchMode::Hybrid => self.ranking.max_results_hybrid,
        };
        RankingConfig::new(
            self.ranking.min_similarity,
            self.ranking.min_rerank,
            max_results,
        )
    }

    pub fn fusion_weights(&self) -> FusionWeights {
        FusionWeights {
            text: self.hybrid.text_weight,
            image: self.hybrid.image_weight,
        }
    }

    pub fn post_fusion_filter(&self) -> PostFusionFilter {
        match self.hybrid.post_fusion {
            PostFusionRule::Combined => PostFusionFilter::Combined {
                min_score: self.hybrid.min_fused_score,
            },
            PostFusionRule::PerAxis => PostFusionFilter::PerAxis,
            PostFusionRule::Disabled => PostFusionFilter::Disabled,
        }
    }

    pub fn hybrid_options(&self) -> HybridOptions {
        HybridOptions {
            weights: self.fusion_weights(),
            strategy: self.hybrid.strategy,
            fusion_key: self.hybrid.fusion_key,
            post_fusion: self.post_fusion_filter(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.indexing.poll_interval_ms)
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| LensError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("content-lens").join("config.toml"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| LensError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            backend: BackendConfig::default(),
            ranking: RankingSection::default(),
            hybrid: HybridSection::default(),
            indexing: IndexingSection::default(),
            profiles: HashMap::new(),
        }
    }
}
