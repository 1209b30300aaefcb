//! Category records

use chrono::{DateTime, Utc};

/// A top-level catalogue category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Stable identifier assigned by the upstream API
    pub id: i64,
    pub name: String,
    /// Number of items attributed to this category by the last crawl
    pub item_count: u64,
    /// When the last crawl of this category finished
    pub last_update: Option<DateTime<Utc>>,
}

impl Category {
    /// Creates a category that has never been crawled
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            item_count: 0,
            last_update: None,
        }
    }
}
