//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::crawler::HarvestSummary;
use crate::model::StoredPage;
use crate::storage::{RunRecord, SqliteStorage, StorageResult};
use chrono::{DateTime, Utc};

/// Per-category slice of the harvest statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStatistics {
    pub id: i64,
    pub name: String,
    pub item_count: u64,
    pub last_update: Option<DateTime<Utc>>,
    pub pages_succeeded: u64,
    pub pages_failed: u64,
}

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Categories in id order
    pub categories: Vec<CategoryStatistics>,

    /// Number of item rows stored across all categories
    pub total_items: u64,

    /// Most recent harvest run, if any
    pub latest_run: Option<RunRecord>,
}

impl HarvestStatistics {
    pub fn total_failed_pages(&self) -> u64 {
        self.categories.iter().map(|c| c.pages_failed).sum()
    }

    pub fn total_pages(&self) -> u64 {
        self.categories
            .iter()
            .map(|c| c.pages_succeeded + c.pages_failed)
            .sum()
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &SqliteStorage) -> StorageResult<HarvestStatistics> {
    let mut categories = Vec::new();

    for category in storage.load_categories()? {
        let (pages_succeeded, pages_failed) = storage.page_outcome_counts(category.id)?;
        categories.push(CategoryStatistics {
            id: category.id,
            name: category.name,
            item_count: category.item_count,
            last_update: category.last_update,
            pages_succeeded,
            pages_failed,
        });
    }

    Ok(HarvestStatistics {
        categories,
        total_items: storage.count_items()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Categories: {}", stats.categories.len());
    println!("  Items stored: {}", stats.total_items);
    println!("  Pages recorded: {}", stats.total_pages());
    println!("  Pages awaiting retry: {}", stats.total_failed_pages());
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  Id: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Failed pages: {}", run.failed_pages);
        println!();
    }

    println!("Categories:");
    for category in &stats.categories {
        let updated = category
            .last_update
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  [{}] {}: {} items, {} pages ok, {} failed (updated {})",
            category.id,
            category.name,
            category.item_count,
            category.pages_succeeded,
            category.pages_failed,
            updated
        );
    }
    println!();

    let total_pages = stats.total_pages();
    let success_rate = if total_pages > 0 {
        ((total_pages - stats.total_failed_pages()) as f64 / total_pages as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages validated)",
        success_rate,
        total_pages - stats.total_failed_pages(),
        total_pages
    );
}

/// Prints the stored pages that still need a retry
pub fn print_failed_pages(pages: &[StoredPage]) {
    if pages.is_empty() {
        println!("No failed pages recorded");
        return;
    }

    println!("Failed Pages ({}):", pages.len());
    for page in pages {
        println!(
            "  category={} alpha={} page={} items={} at {}",
            page.category_id,
            page.alpha,
            page.page_num,
            page.item_count,
            page.last_updated.to_rfc3339()
        );
    }
}

/// Prints the outcome of a harvest just run
pub fn print_harvest_summary(summary: &HarvestSummary) {
    println!("=== Harvest Summary ===\n");

    for report in &summary.reports {
        println!(
            "  [{}] {} / {} items across {} pages",
            report.category_id, report.total_count, report.expected_total, report.pages_fetched
        );
        for failed in &report.failed_pages {
            println!("    - {}", failed);
        }
    }

    for (category_id, reason) in &summary.aborted {
        println!("  [{}] aborted: {}", category_id, reason);
    }

    println!();
    println!("Items: {}", summary.total_items());
    println!("Failed pages: {}", summary.failed_page_count());
}
