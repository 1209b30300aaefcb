//! Storage traits and error types
//!
//! This module defines the capability interface the crawler persists through
//! and the associated error types.

use crate::model::{Category, Item, PageRequest, StoredPage};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(
        "Refusing to overwrite successful page (category={category_id}, alpha={alpha}, page={page_num}): \
         stored {stored} items, new fetch has {actual}"
    )]
    Regression {
        category_id: i64,
        alpha: String,
        page_num: u32,
        stored: u64,
        actual: u64,
    },

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence capability handed to the category crawler
///
/// Every write is an idempotent upsert; replaying the same call leaves the
/// stored state unchanged.
pub trait Storage {
    /// Upserts a batch of items keyed by item id
    ///
    /// The batch is all-or-nothing: on error none of the items are written.
    fn save_page_items(&mut self, items: &[Item]) -> StorageResult<()>;

    /// Upserts a page request keyed by `(category_id, alpha, page_num)`
    ///
    /// Returns the stable id of the stored record. Fails with
    /// [`StorageError::Regression`] when the stored record was successful and
    /// `actual_item_count` is smaller than the count it recorded.
    fn save_page(&mut self, page: &PageRequest, actual_item_count: u64) -> StorageResult<i64>;

    /// Upserts a category's name, item count and last update time
    fn update_category(&mut self, category: &Category) -> StorageResult<()>;

    /// Stored page requests of a category that did not validate, oldest first
    fn failed_pages(&self, category_id: i64) -> StorageResult<Vec<StoredPage>>;

    /// Number of items currently attributed to a category
    fn count_category_items(&self, category_id: i64) -> StorageResult<u64>;
}
