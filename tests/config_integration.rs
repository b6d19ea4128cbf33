//! Config file round trips, profiles and validation on disk

use content_lens::config::{Config, PostFusionRule};
use content_lens::error::LensError;
use content_lens::ranking::PostFusionFilter;
use content_lens::search::{HybridStrategy, SearchMode};
use tempfile::TempDir;

#[test]
fn test_save_and_load_default_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");

    Config::default().save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();

    assert_eq!(loaded.backend.base_url, "http://localhost:8000/api");
    assert_eq!(loaded.ranking_for(SearchMode::Image).max_results, 12);
    assert_eq!(loaded.ranking.min_rerank, 0.003);
}

#[test]
fn test_missing_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let err = Config::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, LensError::ConfigNotFound { .. }));
}

#[test]
fn test_profile_applied_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[_meta]
schema_version = "1.0.0"

[backend]
environment = "development"

[hybrid]
post_fusion = "per_axis"

[profiles.production]
environment = "production"
base_url = "https://search.example.com/api"
text_weight = 0.5
strategy = "server"
"#,
    )
    .unwrap();

    let config = Config::load_with_profile(&path, "production").unwrap();
    assert_eq!(config.backend.environment, "production");
    assert_eq!(config.backend.base_url, "https://search.example.com/api");
    assert_eq!(config.hybrid.strategy, HybridStrategy::Server);
    assert_eq!(config.hybrid.post_fusion, PostFusionRule::PerAxis);

    let options = config.hybrid_options();
    assert_eq!(options.weights.text, 0.5);
    assert_eq!(options.weights.image, 0.5);
    assert_eq!(options.post_fusion, PostFusionFilter::PerAxis);

    assert!(Config::load_with_profile(&path, "staging").is_err());
}

#[test]
fn test_invalid_file_collects_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[_meta]
schema_version = "0.9.0"

[ranking]
max_results_image = 0

[hybrid]
text_weight = 0.6
image_weight = 0.6
"#,
    )
    .unwrap();

    match Config::load(&path) {
        Err(LensError::ConfigValidation { errors }) => {
            assert_eq!(errors.len(), 3);
            assert!(errors.iter().any(|e| e.path == "_meta.schema_version"));
            assert!(errors.iter().any(|e| e.path == "ranking.max_results_image"));
            assert!(errors.iter().any(|e| e.path == "hybrid.text_weight"));
        }
        other => panic!("expected validation errors, got {:?}", other),
    }
}

#[test]
fn test_malformed_toml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[_meta\nschema_version = ").unwrap();

    assert!(matches!(Config::load(&path), Err(LensError::Toml(_))));
}
