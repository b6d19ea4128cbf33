use crate::config::{Config, PostFusionRule, SCHEMA_VERSION};
use crate::error::{LensError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem found
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_backend(config, &mut errors);
        Self::validate_ranking(config, &mut errors);
        Self::validate_hybrid(config, &mut errors);
        Self::validate_indexing(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LensError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_backend(config: &Config, errors: &mut Vec<ValidationError>) {
        let base_url = &config.backend.base_url;
        match reqwest::Url::parse(base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "backend.base_url",
                format!("Scheme must be http or https, got '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "backend.base_url",
                format!("Invalid URL '{}': {}", base_url, e),
            )),
        }

        if config.backend.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "backend.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }

        if config.backend.environment.trim().is_empty() {
            errors.push(ValidationError::new(
                "backend.environment",
                "Environment cannot be empty",
            ));
        }
    }

    fn validate_ranking(config: &Config, errors: &mut Vec<ValidationError>) {
        let ranking = &config.ranking;

        for (path, value) in [
            ("ranking.min_similarity", ranking.min_similarity),
            ("ranking.min_rerank", ranking.min_rerank),
        ] {
            if !value.is_finite() {
                errors.push(ValidationError::new(
                    path,
                    format!("Threshold must be a finite number, got {}", value),
                ));
            }
        }

        for (path, value) in [
            ("ranking.max_results_text", ranking.max_results_text),
            ("ranking.max_results_image", ranking.max_results_image),
            ("ranking.max_results_hybrid", ranking.max_results_hybrid),
            ("ranking.request_limit", ranking.request_limit),
        ] {
            if value == 0 {
                errors.push(ValidationError::new(path, "Must be greater than 0"));
            }
        }
    }

    fn validate_hybrid(config: &Config, errors: &mut Vec<ValidationError>) {
        if let Err(e) = config.fusion_weights().validate() {
            errors.push(ValidationError::new("hybrid.text_weight", e.to_string()));
        }

        if config.hybrid.post_fusion == PostFusionRule::Combined
            && !config.hybrid.min_fused_score.is_finite()
        {
            errors.push(ValidationError::new(
                "hybrid.min_fused_score",
                format!(
                    "Threshold must be a finite number, got {}",
                    config.hybrid.min_fused_score
                ),
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.poll_interval_ms == 0 {
            errors.push(ValidationError::new(
                "indexing.poll_interval_ms",
                "Poll interval must be greater than 0",
            ));
        }

        if config.indexing.batch_size == 0 {
            errors.push(ValidationError::new(
                "indexing.batch_size",
                "Batch size must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_bad_base_url() {
        let mut config = Config::default();
        config.backend.base_url = "ftp://search.local".to_string();
        assert!(ConfigValidator::validate(&config).is_err());

        config.backend.base_url = "not a url".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.hybrid.text_weight = 0.9;
        config.ranking.max_results_text = 0;
        config.indexing.poll_interval_ms = 0;

        match ConfigValidator::validate(&config) {
            Err(LensError::ConfigValidation { errors }) => {
                let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
                assert_eq!(
                    paths,
                    vec![
                        "ranking.max_results_text",
                        "hybrid.text_weight",
                        "indexing.poll_interval_ms"
                    ]
                );
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_threshold() {
        let mut config = Config::default();
        config.ranking.min_rerank = f64::NAN;
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
