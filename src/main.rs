//! # Civic Discovery CLI (`civic`)
//!
//! The `civic` binary runs searches against the configured source adapters,
//! manages the local catalog, and starts the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! civic --config ./config/civic.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `civic search "<text>"` | Fan out, rank, and print a result page |
//! | `civic discover --user <id>` | Discover feed (no text) |
//! | `civic suggest "<partial>"` | Typed completions |
//! | `civic enhance "<text>"` | Show synonym expansion, inferred filters, intent |
//! | `civic sources` | List configured adapters |
//! | `civic catalog init` | Create the local catalog database |
//! | `civic catalog import <file>` | Load a JSON array of items into the catalog |
//! | `civic serve` | Start the HTTP API |
//! | `civic stats` | Print admin stats from a running server |
//!
//! ## Examples
//!
//! ```bash
//! # Live congressional coverage on YouTube or Twitch
//! civic search "congress live" --platform youtube --platform twitch
//!
//! # Most viewed budget videos with captions, as JSON
//! civic search budget --sort views --subtitles --json
//!
//! # Seed the offline catalog
//! civic catalog init
//! civic catalog import ./fixtures/archive.json
//!
//! # Start the API
//! RUST_LOG=civic_discovery=debug civic serve
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use civic_discovery::adapter_catalog::{run_catalog_import, run_catalog_init};
use civic_discovery::config::{self, Config};
use civic_discovery::models::{Platform, SearchFilters, SearchQuery, SortBy};
use civic_discovery::{search, server, sources, stats};

/// Civic Discovery CLI: aggregate, rank, and personalize civic video
/// content from several upstream sources.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/civic.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "civic",
    about = "Civic Discovery — aggregate, rank, and personalize civic video content",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/civic.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search all configured sources.
    Search {
        /// Free-text query. Words like "live", "recent", or "captions" become filters.
        text: String,

        /// Restrict to a platform (repeatable).
        #[arg(long = "platform")]
        platforms: Vec<Platform>,

        /// Restrict to a category (repeatable, case-insensitive).
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Only live streams.
        #[arg(long)]
        live: bool,

        /// Only items with subtitles.
        #[arg(long)]
        subtitles: bool,

        #[arg(long)]
        min_views: Option<u64>,

        /// Sort: relevance, date, views, engagement, or trending.
        #[arg(long)]
        sort: Option<SortBy>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Personalize for this user id.
        #[arg(long)]
        user: Option<String>,

        /// Print the raw JSON result.
        #[arg(long)]
        json: bool,
    },

    /// Discover feed: no query text, ranked by engagement, freshness, and affinities.
    Discover {
        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long)]
        json: bool,
    },

    /// Auto-complete a partial query.
    Suggest {
        partial: String,
    },

    /// Show how a query is expanded and which filters it implies.
    Enhance {
        text: String,
    },

    /// List configured adapters.
    Sources,

    /// Manage the local SQLite catalog.
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Print admin stats from a running server.
    Stats {
        /// Server base URL. Defaults to `http://<server.bind>`.
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Create the catalog schema. Idempotent.
    Init {
        /// Catalog adapter name, when more than one is configured.
        #[arg(long)]
        name: Option<String>,
    },
    /// Upsert a JSON array of items into the catalog.
    Import {
        file: PathBuf,

        #[arg(long)]
        name: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("civic_discovery=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Enhance { text } => {
            search::run_enhance(text)?;
            return Ok(());
        }
        Commands::Suggest { partial } => {
            let cfg = config::load_config(&cli.config).unwrap_or_else(|_| Config::minimal());
            search::run_suggest(&cfg, partial)?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Search {
            text,
            platforms,
            categories,
            live,
            subtitles,
            min_views,
            sort,
            limit,
            offset,
            user,
            json,
        } => {
            let query = SearchQuery {
                text,
                filters: SearchFilters {
                    platforms,
                    categories,
                    is_live: live.then_some(true),
                    has_subtitles: subtitles.then_some(true),
                    min_views,
                    sort_by: sort,
                    ..Default::default()
                },
                limit: limit.unwrap_or(cfg.aggregator.default_limit),
                offset,
            };
            search::run_search(&cfg, query, user.as_deref(), json).await?;
        }
        Commands::Discover {
            user,
            limit,
            offset,
            json,
        } => {
            search::run_discover(&cfg, user.as_deref(), limit, offset, json).await?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg).await?;
        }
        Commands::Catalog { action } => match action {
            CatalogAction::Init { name } => {
                run_catalog_init(&cfg, name.as_deref()).await?;
            }
            CatalogAction::Import { file, name } => {
                run_catalog_import(&cfg, name.as_deref(), &file).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Stats { url } => {
            stats::run_stats(&cfg, url.as_deref()).await?;
        }
        Commands::Enhance { .. } | Commands::Suggest { .. } => {
            // Handled above (before config loading)
        }
    }

    Ok(())
}
