//! Crawler module for catalogue harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded retry and cooldown
//! - The alpha census and page planning
//! - Per-category crawl and reconciliation
//! - Sequential harvesting across categories

mod census;
mod coordinator;
mod fetcher;
mod pages;
mod plan;

pub use census::get_alpha_counts;
pub use coordinator::{CategoryCrawler, CrawlReport};
pub use fetcher::{build_http_client, build_request_url, CatalogueClient, FetchError, RetryPolicy};
pub use pages::get_page;
pub use plan::{plan_bucket, BucketPlan};

use crate::model::Category;
use crate::storage::Storage;

/// What a harvest does for each category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestMode {
    /// Crawl every page of every bucket
    Full,
    /// Re-fetch only pages stored as failed
    RetryFailed,
}

/// Outcome of a harvest over several categories
#[derive(Debug, Default)]
pub struct HarvestSummary {
    pub reports: Vec<CrawlReport>,
    /// Categories whose crawl was aborted, with the reason
    pub aborted: Vec<(i64, String)>,
}

impl HarvestSummary {
    pub fn failed_page_count(&self) -> usize {
        self.reports.iter().map(|r| r.failed_pages.len()).sum()
    }

    pub fn total_items(&self) -> u64 {
        self.reports.iter().map(|r| r.total_count).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.aborted.is_empty() && self.reports.iter().all(CrawlReport::is_complete)
    }
}

/// Harvests `categories` one after another
///
/// A category whose crawl aborts is logged and recorded in the summary; the
/// remaining categories are still harvested.
pub async fn harvest<S: Storage>(
    client: &CatalogueClient,
    storage: &mut S,
    categories: Vec<Category>,
    mode: HarvestMode,
) -> HarvestSummary {
    let mut summary = HarvestSummary::default();
    let total = categories.len();

    for (index, mut category) in categories.into_iter().enumerate() {
        tracing::info!(
            category_id = category.id,
            name = %category.name,
            progress = %format!("{}/{}", index + 1, total),
            ?mode,
            "Harvesting category"
        );

        let mut crawler = CategoryCrawler::new(client, &mut *storage);
        let result = match mode {
            HarvestMode::Full => crawler.crawl(&mut category).await,
            HarvestMode::RetryFailed => crawler.retry_failed(&mut category).await,
        };

        match result {
            Ok(report) => summary.reports.push(report),
            Err(e) => {
                tracing::error!(
                    category_id = category.id,
                    error = %e,
                    "Category harvest aborted"
                );
                summary.aborted.push((category.id, e.to_string()));
            }
        }
    }

    tracing::info!(
        categories = summary.reports.len(),
        aborted = summary.aborted.len(),
        items = summary.total_items(),
        failed_pages = summary.failed_page_count(),
        "Harvest finished"
    );

    summary
}
