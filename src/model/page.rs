//! Page requests and their validation outcomes

use chrono::{DateTime, Utc};
use std::fmt;

/// One fetch of a `(category, alpha, page)` slice and its validation outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub category_id: i64,
    pub alpha: String,
    /// 1-based page number within the bucket
    pub page_num: u32,
    pub last_updated: DateTime<Utc>,
    /// Whether the fetched item count matched the expected count
    pub succeeded: bool,
}

/// A page request as persisted, with its row id and observed item count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub id: i64,
    pub category_id: i64,
    pub alpha: String,
    pub page_num: u32,
    pub last_updated: DateTime<Utc>,
    pub succeeded: bool,
    pub item_count: u64,
}

/// A page that did not validate and should be fetched again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPageRequest {
    pub category_id: i64,
    pub alpha: String,
    pub page_num: u32,
    pub expected: u64,
    pub actual: u64,
}

impl fmt::Display for FailedPageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "category={} alpha={} page={} (expected {}, got {})",
            self.category_id, self.alpha, self.page_num, self.expected, self.actual
        )
    }
}
