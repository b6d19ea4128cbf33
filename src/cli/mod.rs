//! CLI command definitions and parsing
use crate::indexing::BatchEntry;
use crate::search::SearchMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod output;

#[derive(Parser, Debug)]
#[command(
    name = "content-lens",
    version,
    about = "Text, image and hybrid search over an external content search service",
    long_about = "content-lens queries a content search service by text, by image or both, \
                  filters the scored candidates against similarity and rerank thresholds, \
                  fuses hybrid results by weight and prints a short ranked list. It also \
                  drives reindexing and shows service analytics."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/content-lens/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration profile to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search by text, image, or both
    Search {
        /// Search query text
        query: Option<String>,

        /// Query image URL
        #[arg(long, conflicts_with = "image_file")]
        image_url: Option<String>,

        /// Query image file to upload
        #[arg(long, value_name = "PATH")]
        image_file: Option<PathBuf>,

        /// Search mode (inferred from the inputs when omitted)
        #[arg(short, long, value_enum)]
        mode: Option<SearchMode>,

        /// Use plain text search instead of semantic search
        #[arg(long)]
        exact: bool,

        /// Restrict to a content type (repeatable)
        #[arg(short = 't', long = "content-type", value_name = "UID")]
        content_types: Vec<String>,

        /// Maximum number of results to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Text weight for hybrid search; image weight is 1 - this
        #[arg(long, value_name = "0.0-1.0")]
        text_weight: Option<f64>,

        /// Let the service fuse hybrid results instead of fusing locally
        #[arg(long)]
        server_fusion: bool,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Start a reindex and follow its progress
    Reindex {
        /// Content environment to index (defaults to the configured one)
        #[arg(short, long)]
        environment: Option<String>,

        /// Entries per indexing batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Only reindex these content types (repeatable)
        #[arg(short = 't', long = "content-type", value_name = "UID")]
        content_types: Vec<String>,

        /// Return right after the reindex is accepted
        #[arg(long)]
        detach: bool,
    },

    /// Inspect or modify the search index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// List content types known to the service
    ContentTypes {
        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show search analytics
    Analytics {
        /// Reporting window in days
        #[arg(short, long)]
        days: Option<u32>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics and service capabilities
    Stats {
        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Show index status
    Status,

    /// Remove every entry from the index
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Index specific entries
    Batch {
        /// Entries as contentType:uid
        #[arg(required = true, value_name = "CONTENT_TYPE:UID")]
        entries: Vec<BatchEntry>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_flags() {
        let cli = Cli::try_parse_from([
            "content-lens",
            "search",
            "red shoes",
            "--image-url",
            "https://cdn.example.com/shoe.png",
            "-t",
            "product",
            "-t",
            "article",
            "--text-weight",
            "0.6",
        ])
        .unwrap();

        match cli.command {
            Commands::Search {
                query,
                image_url,
                content_types,
                text_weight,
                mode,
                ..
            } => {
                assert_eq!(query.as_deref(), Some("red shoes"));
                assert!(image_url.is_some());
                assert_eq!(content_types, vec!["product", "article"]);
                assert_eq!(text_weight, Some(0.6));
                assert!(mode.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_image_inputs_conflict() {
        let result = Cli::try_parse_from([
            "content-lens",
            "search",
            "--image-url",
            "https://cdn.example.com/a.png",
            "--image-file",
            "a.png",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_entries_parse() {
        let cli = Cli::try_parse_from(["content-lens", "index", "batch", "article:blt1"]).unwrap();
        match cli.command {
            Commands::Index {
                action: IndexAction::Batch { entries },
            } => assert_eq!(entries[0].uid, "blt1"),
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Cli::try_parse_from(["content-lens", "index", "batch", "nocolon"]).is_err());
    }
}
