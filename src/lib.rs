//! Catalogue-Harvest: a resumable harvester for paginated item catalogues
//!
//! This crate crawls a rate-limited item-listing API category by category,
//! splitting each category into first-letter ("alpha") buckets and fixed-size
//! pages, and reconciles every page into SQLite while recording which pages
//! failed validation so they can be retried later.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Catalogue-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Alpha census unavailable for category {category_id}: {reason}")]
    Census { category_id: i64, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Catalogue-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CatalogueClient, CategoryCrawler, CrawlReport};
pub use model::{Category, FailedPageRequest, Item, PageRequest};
pub use storage::{SqliteStorage, Storage};
