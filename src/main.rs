//! # skinrag CLI
//!
//! Ranks skincare products against target ingredients, per product
//! category, and serves the same pipeline over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! skinrag --config ./config/skinrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `skinrag search --ingredients cleanser=salicylic acid` | Rank products per category |
//! | `skinrag recommend "level 2"` | Severity → ingredients → products |
//! | `skinrag catalog` | Catalog row counts per category |
//! | `skinrag serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Two categories, two results each, as JSON
//! skinrag search \
//!   --ingredients "cleanser=salicylic acid,tea tree" \
//!   --ingredients moisturizer=ceramides \
//!   --top-k 2 --json
//!
//! # Recommendation with a generated routine (needs OPENAI_API_KEY)
//! skinrag recommend moderate --plan
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use skincare_rag::config::{load_config, Config};
use skincare_rag::{catalog, recommend, search, server};

/// Ingredient-aware skincare product retrieval.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/skinrag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "skinrag",
    about = "Ingredient-aware skincare product retrieval",
    version,
    long_about = "Ranks catalog products against target ingredients per product category, \
    combining ingredient-text similarity with an exact-match bonus, and turns acne severity \
    into ingredient recommendations and a daily routine."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/skinrag.toml`. When the file does not exist,
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/skinrag.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Rank products for one or more categories.
    ///
    /// Each `--ingredients` value is `category=ingredient,ingredient`;
    /// categories are searched and printed in argument order.
    Search {
        /// Target ingredients for a category (repeatable).
        #[arg(long = "ingredients", short = 'i', value_name = "CATEGORY=A,B")]
        ingredients: Vec<String>,

        /// Maximum products per category (overrides config).
        #[arg(long)]
        top_k: Option<usize>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Recommend ingredients and products for an acne severity.
    ///
    /// Accepts classifier labels (`level -1` .. `level 3`) or severity
    /// names (`mild`, `moderate`, ...). Requires `[recommender]`.
    Recommend {
        severity: String,

        /// Also generate a daily routine from the retrieved products.
        #[arg(long)]
        plan: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show catalog row counts per product type and configured category.
    Catalog,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::warn!(path = %path.display(), "config file not found; using defaults");
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = resolve_config(&cli.config)?;

    match cli.command {
        Commands::Search {
            ingredients,
            top_k,
            json,
        } => {
            search::run_search(&cfg, &ingredients, top_k, json).await?;
        }
        Commands::Recommend {
            severity,
            plan,
            json,
        } => {
            recommend::run_recommend(&cfg, &severity, plan, json).await?;
        }
        Commands::Catalog => {
            catalog::run_catalog(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
