//! Catalogue-Harvest main entry point
//!
//! This is the command-line interface for the catalogue harvester.

use anyhow::{Context, Result};
use catalogue_harvest::config::{load_config_with_hash, Config};
use catalogue_harvest::crawler::{harvest, CatalogueClient, HarvestMode};
use catalogue_harvest::model::Category;
use catalogue_harvest::output::{
    load_statistics, print_failed_pages, print_harvest_summary, print_statistics,
};
use catalogue_harvest::storage::{RunStatus, SqliteStorage};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalogue-Harvest: a resumable item catalogue harvester
///
/// Crawls a paginated item-listing API category by category, validates every
/// page against the per-letter census and stores items in SQLite. Pages that
/// fail validation are recorded and can be retried with --retry-failed.
#[derive(Parser, Debug)]
#[command(name = "catalogue-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable item catalogue harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Only harvest the given category id (repeatable)
    #[arg(long = "category", value_name = "ID")]
    categories: Vec<i64>,

    /// Re-fetch only pages recorded as failed
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "failed"])]
    retry_failed: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with_all = ["stats", "failed"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "failed"])]
    stats: bool,

    /// List pages recorded as failed and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    failed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let selected = select_categories(&config, &cli.categories);

    if cli.dry_run {
        handle_dry_run(&config, &selected);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.failed {
        handle_failed(&config)?;
    } else {
        let mode = if cli.retry_failed {
            HarvestMode::RetryFailed
        } else {
            HarvestMode::Full
        };
        handle_harvest(&config, &config_hash, selected, mode).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalogue_harvest=info,warn"),
            1 => EnvFilter::new("catalogue_harvest=debug,info"),
            2 => EnvFilter::new("catalogue_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Configured categories, narrowed to `--category` ids when any are given
fn select_categories(config: &Config, ids: &[i64]) -> Vec<Category> {
    for id in ids {
        if !config.categories.iter().any(|c| c.id == *id) {
            tracing::warn!(category_id = id, "Unknown category id; ignoring");
        }
    }

    config
        .categories
        .iter()
        .filter(|c| ids.is_empty() || ids.contains(&c.id))
        .map(Category::from)
        .collect()
}

fn open_storage(config: &Config) -> Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    SqliteStorage::new(path).with_context(|| format!("failed to open {}", path.display()))
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config, selected: &[Category]) {
    println!("=== Catalogue-Harvest Dry Run ===\n");

    println!("API:");
    println!("  Summary endpoint: {}", config.api.summary_url);
    println!("  Items endpoint: {}", config.api.items_url);
    println!("  Page size: {}", config.api.page_size);
    println!("  Request timeout: {}s", config.api.request_timeout);

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Wait between attempts: {}ms", config.retry.retry_wait);
    println!(
        "  Cooldown: {}s after {} consecutive failures",
        config.retry.cooldown, config.retry.cooldown_after
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nCategories ({}):", selected.len());
    for category in selected {
        println!("  - [{}] {}", category.id, category.name);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would harvest {} categories", selected.len());
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(config)?;
    let stats = load_statistics(&storage).context("failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --failed mode: lists pages awaiting a retry
fn handle_failed(config: &Config) -> Result<()> {
    let storage = open_storage(config)?;
    let pages = storage
        .list_failed_pages()
        .context("failed to list failed pages")?;
    print_failed_pages(&pages);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: &Config,
    config_hash: &str,
    selected: Vec<Category>,
    mode: HarvestMode,
) -> Result<()> {
    let mut storage = open_storage(config)?;

    let seeded: Vec<Category> = config.categories.iter().map(Category::from).collect();
    storage
        .seed_categories(&seeded)
        .context("failed to seed categories")?;

    // Stored rows carry the counts from earlier harvests
    let mut categories = Vec::with_capacity(selected.len());
    for category in &selected {
        categories.push(
            storage
                .get_category(category.id)
                .with_context(|| format!("failed to load category {}", category.id))?,
        );
    }

    let client = CatalogueClient::from_config(config).context("failed to build HTTP client")?;

    let run_id = storage
        .create_run(config_hash)
        .context("failed to record harvest run")?;
    tracing::info!(run_id, categories = categories.len(), ?mode, "Starting harvest");

    let summary = harvest(&client, &mut storage, categories, mode).await;

    let status = if summary.aborted.is_empty() {
        RunStatus::Completed
    } else {
        RunStatus::Failed
    };
    storage
        .finish_run(run_id, status, summary.failed_page_count() as u64)
        .context("failed to finish harvest run")?;

    print_harvest_summary(&summary);

    tracing::info!(run_id, status = status.to_db_string(), "Harvest run recorded");
    Ok(())
}
