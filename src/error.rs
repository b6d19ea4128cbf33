use std::path::PathBuf;
use thiserror::Error;

/// Main error type for content-lens
#[derive(Error, Debug)]
pub enum LensError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Ranking or fusion parameters rejected before a search is dispatched
    #[error("Invalid search configuration: {0}")]
    InvalidConfiguration(String),

    /// Query, image URL or upload failed validation
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Network failure or timeout talking to the search service
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },

    /// Search service answered with a non-2xx status
    #[error("Request to {endpoint} returned HTTP {status}: {message}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// `success: false` or a body that does not match the expected shape
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// Reindex lifecycle errors
    #[error("Indexing error: {0}")]
    Indexing(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LensError {
    /// True for the failures a search caller treats uniformly: transport,
    /// HTTP status and invalid response. None of them carry partial results.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            LensError::Transport { .. }
                | LensError::HttpStatus { .. }
                | LensError::InvalidResponse { .. }
        )
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for content-lens operations
pub type Result<T> = std::result::Result<T, LensError>;
