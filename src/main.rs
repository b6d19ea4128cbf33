use content_lens::cli::output;
use content_lens::cli::{Cli, Commands, ConfigAction, IndexAction};
use content_lens::client::{CatalogBackend, HttpSearchClient, IndexingBackend, StackConfigLoader};
use content_lens::config::{Config, ConfigValidator};
use content_lens::error::{LensError, Result};
use content_lens::indexing::{BatchIndexParams, ReindexParams, ReindexPhase, ReindexSession};
use content_lens::ranking::FusionWeights;
use content_lens::search::{
    HybridStrategy, ImageSource, ImageUpload, SearchMode, SearchOrchestrator, SearchRequest,
    TextStrategy,
};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Config { action } => cmd_config(cli.config, cli.profile, action),
        command => {
            let config = load_config(cli.config, cli.profile)?;
            let runtime = tokio::runtime::Runtime::new().map_err(|e| LensError::Io {
                source: e,
                context: "Failed to create tokio runtime".to_string(),
            })?;
            runtime.block_on(run(config, command))
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose {
        "content_lens=debug"
    } else {
        "content_lens=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn run(config: Config, command: Commands) -> Result<()> {
    let client = Arc::new(HttpSearchClient::new(&config.backend)?);
    tracing::debug!(
        "Using search service at {} ({})",
        client.base_url(),
        client.environment()
    );

    match command {
        Commands::Search {
            query,
            image_url,
            image_file,
            mode,
            exact,
            content_types,
            limit,
            text_weight,
            server_fusion,
            json,
        } => {
            let image = match (image_url, image_file) {
                (Some(url), _) => Some(ImageSource::Url(url)),
                (None, Some(path)) => {
                    Some(ImageSource::File(ImageUpload::from_path(&path).await?))
                }
                (None, None) => None,
            };
            let options = SearchOptions {
                mode,
                exact,
                content_types,
                limit,
                text_weight,
                server_fusion,
            };
            let request = build_search_request(&config, query, image, options)?;
            cmd_search(client, &request, json).await
        }
        Commands::Reindex {
            environment,
            batch_size,
            content_types,
            detach,
        } => {
            let params = ReindexParams {
                environment: Some(
                    environment.unwrap_or_else(|| config.backend.environment.clone()),
                ),
                batch_size: Some(batch_size.unwrap_or(config.indexing.batch_size)),
                content_types: (!content_types.is_empty()).then_some(content_types),
            };
            cmd_reindex(&config, client, &params, detach).await
        }
        Commands::Index { action } => cmd_index(&config, client, action).await,
        Commands::ContentTypes { json } => {
            let content_types = client.get_content_types().await?;
            if json {
                print_json(&content_types)?;
            } else {
                output::print_content_types(&content_types);
            }
            Ok(())
        }
        Commands::Analytics { days, json } => {
            let analytics = client.get_analytics(days).await?;
            if json {
                print_json(&analytics)?;
            } else {
                output::print_analytics(&analytics);
            }
            Ok(())
        }
        Commands::Stats { json } => cmd_stats(client, json).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Search flags that shape the request beyond its inputs
struct SearchOptions {
    mode: Option<SearchMode>,
    exact: bool,
    content_types: Vec<String>,
    limit: Option<usize>,
    text_weight: Option<f64>,
    server_fusion: bool,
}

fn infer_mode(query: Option<&str>, image: Option<&ImageSource>) -> SearchMode {
    let has_query = query.map(|q| !q.trim().is_empty()).unwrap_or(false);
    match (has_query, image.is_some()) {
        (true, true) => SearchMode::Hybrid,
        (false, true) => SearchMode::Image,
        _ => SearchMode::Text,
    }
}

fn build_search_request(
    config: &Config,
    query: Option<String>,
    image: Option<ImageSource>,
    options: SearchOptions,
) -> Result<SearchRequest> {
    let mode = options
        .mode
        .unwrap_or_else(|| infer_mode(query.as_deref(), image.as_ref()));

    let request = match mode {
        SearchMode::Text => SearchRequest::text(query.unwrap_or_default()),
        SearchMode::Image => {
            let image = image.ok_or_else(|| {
                LensError::InvalidQuery(
                    "Image search requires --image-url or --image-file".to_string(),
                )
            })?;
            SearchRequest::image(image)
        }
        SearchMode::Hybrid => SearchRequest::hybrid(query, image),
    };

    let mut ranking = config.ranking_for(mode);
    if let Some(limit) = options.limit {
        ranking.max_results = limit;
    }

    let mut hybrid = config.hybrid_options();
    if let Some(text_weight) = options.text_weight {
        hybrid.weights = FusionWeights::from_text(text_weight)?;
    }
    if options.server_fusion {
        hybrid.strategy = HybridStrategy::Server;
    }

    let text_strategy = if options.exact {
        TextStrategy::Text
    } else {
        TextStrategy::Semantic
    };

    Ok(request
        .with_ranking(ranking)
        .with_hybrid(hybrid)
        .with_content_types(options.content_types)
        .with_text_strategy(text_strategy)
        .with_request_limit(config.ranking.request_limit.max(ranking.max_results)))
}

async fn cmd_search(
    client: Arc<HttpSearchClient>,
    request: &SearchRequest,
    json: bool,
) -> Result<()> {
    tracing::info!("Running {:?} search", request.mode);

    let orchestrator = SearchOrchestrator::new(client.clone());
    let results = orchestrator.search(request).await?;

    if json {
        return print_json(&results);
    }

    // Display names only; a failed lookup falls back to raw uids
    let content_types = match client.get_content_types().await {
        Ok(content_types) => content_types,
        Err(e) => {
            tracing::debug!("Content type lookup failed: {}", e);
            Vec::new()
        }
    };
    output::print_results(&results, &content_types);
    Ok(())
}

async fn cmd_reindex(
    config: &Config,
    client: Arc<HttpSearchClient>,
    params: &ReindexParams,
    detach: bool,
) -> Result<()> {
    let mut session = ReindexSession::new(client, config.poll_interval());
    let status = session.start(params).await?;

    println!("✓ Reindex started");
    if let Some(message) = &status.message {
        println!("  {}", message);
    }

    if detach {
        println!("  Run 'content-lens index status' to check on it");
        return Ok(());
    }

    let mut updates = session.poller().subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if let Some(progress) = state.progress() {
                    println!("  {}", output::progress_line(progress));
                }
                if state.is_terminal() {
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping progress polling; the reindex continues on the server");
                session.stop().await;
                break;
            }
        }
    }

    match session.wait().await {
        ReindexPhase::Completed(progress) => {
            println!("✓ Reindex completed: {} entries", progress.processed);
            for error in &progress.errors {
                println!("  ⚠ {}", error);
            }
            Ok(())
        }
        ReindexPhase::Failed(message) => Err(LensError::Indexing(message)),
        ReindexPhase::Stopped => Ok(()),
        phase => {
            tracing::debug!("Reindex ended in phase {:?}", phase);
            Ok(())
        }
    }
}

async fn cmd_index(
    config: &Config,
    client: Arc<HttpSearchClient>,
    action: IndexAction,
) -> Result<()> {
    match action {
        IndexAction::Status => {
            let status = client.get_index_status().await?;
            output::print_index_status(&status);
        }
        IndexAction::Clear { yes } => {
            if !yes && !confirm("Remove every entry from the search index?")? {
                println!("Aborted");
                return Ok(());
            }
            let ack = client.clear_index().await?;
            println!(
                "✓ {}",
                ack.message.as_deref().unwrap_or("Index cleared")
            );
        }
        IndexAction::Batch { entries } => {
            let count = entries.len();
            let params = BatchIndexParams {
                entries,
                environment: Some(config.backend.environment.clone()),
            };
            let ack = client.batch_index(&params).await?;
            if !ack.success {
                return Err(LensError::Indexing(
                    ack.message
                        .unwrap_or_else(|| "Batch indexing failed".to_string()),
                ));
            }
            println!("✓ Submitted {} entries for indexing", count);
        }
    }
    Ok(())
}

async fn cmd_stats(client: Arc<HttpSearchClient>, json: bool) -> Result<()> {
    let stats = client.get_stats().await?;
    if json {
        return print_json(&stats);
    }

    output::print_stats(&stats);

    let loader = StackConfigLoader::new(client);
    match loader.load().await {
        Ok(stack) => {
            println!("\nStack: {}", stack.stack_api_key);
            if let Some(environment) = &stack.environment {
                println!("Environment: {}", environment);
            }
        }
        Err(e) => tracing::debug!("Stack configuration unavailable: {}", e),
    }
    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, profile)?;
            let value = toml::Value::try_from(&config)?;

            let shown = match section {
                Some(section) => value.get(&section).cloned().ok_or_else(|| {
                    LensError::Config(format!("Unknown configuration section: {}", section))
                })?,
                None => value,
            };

            println!("{}", toml::to_string_pretty(&shown)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Search service: {}", config.backend.base_url);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LensError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'content-lens config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            tracing::warn!("Ignoring profile '{}' without a config file", profile);
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| LensError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;

    print!("{} [y/N] ", prompt);
    std::io::stdout().flush().map_err(|e| LensError::Io {
        source: e,
        context: "Failed to flush stdout".to_string(),
    })?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .map_err(|e| LensError::Io {
            source: e,
            context: "Failed to read confirmation".to_string(),
        })?;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
