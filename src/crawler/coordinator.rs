//! Category crawler - crawl-and-reconcile orchestration
//!
//! For one category this module:
//! - Runs the alpha census and plans the pages of every bucket
//! - Fetches pages in bucket order, then ascending page order
//! - Validates each page's item count against the plan
//! - Persists page outcomes and items through the injected [`Storage`]
//! - Reports the pages that did not validate

use crate::crawler::census::get_alpha_counts;
use crate::crawler::pages::get_page;
use crate::crawler::plan::plan_bucket;
use crate::crawler::CatalogueClient;
use crate::model::{Category, FailedPageRequest, Item, PageRequest};
use crate::storage::Storage;
use crate::Result;
use chrono::Utc;

/// Outcome of one pass over a category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub category_id: i64,
    /// Item total reported by the census
    pub expected_total: u64,
    /// Items the category holds after this pass: the fetched sum for a full
    /// crawl, the stored item count after a failed-page retry
    pub total_count: u64,
    pub pages_fetched: u32,
    /// Pages whose item count did not match the plan, in fetch order
    pub failed_pages: Vec<FailedPageRequest>,
}

impl CrawlReport {
    fn new(category_id: i64, expected_total: u64) -> Self {
        Self {
            category_id,
            expected_total,
            ..Self::default()
        }
    }

    /// True when every page validated and the totals agree
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty() && self.total_count == self.expected_total
    }
}

/// Crawls categories against a catalogue client, persisting into `S`
pub struct CategoryCrawler<'a, S: Storage> {
    client: &'a CatalogueClient,
    storage: &'a mut S,
}

impl<'a, S: Storage> CategoryCrawler<'a, S> {
    pub fn new(client: &'a CatalogueClient, storage: &'a mut S) -> Self {
        Self { client, storage }
    }

    /// Crawls every page of `category` and updates its item count
    ///
    /// Only a census failure aborts the crawl; nothing is fetched or written
    /// in that case. Page fetch failures, count mismatches and persistence
    /// errors are logged and recorded, and the category is always updated
    /// exactly once at the end.
    pub async fn crawl(&mut self, category: &mut Category) -> Result<CrawlReport> {
        tracing::info!(category_id = category.id, name = %category.name, "Crawling category");

        let census = get_alpha_counts(self.client, category.id).await?;
        let mut report = CrawlReport::new(category.id, census.total());

        for bucket in census.buckets() {
            let plan = plan_bucket(&bucket.alpha, bucket.count, self.client.page_size());
            tracing::debug!(
                category_id = category.id,
                alpha = %plan.alpha,
                items = plan.item_count,
                pages = plan.page_count,
                "Crawling alpha bucket"
            );

            let mut bucket_items = Vec::new();
            for page_num in plan.pages() {
                let items = self
                    .fetch_page(
                        category.id,
                        &plan.alpha,
                        page_num,
                        plan.expected_count(page_num),
                        &mut report,
                    )
                    .await;
                bucket_items.extend(items);
            }

            self.save_items(category.id, &plan.alpha, &bucket_items);
        }

        if report.total_count != report.expected_total {
            tracing::warn!(
                category_id = category.id,
                expected = report.expected_total,
                actual = report.total_count,
                "Item total differs from census total"
            );
        }

        category.item_count = report.total_count;
        category.last_update = Some(Utc::now());
        self.finish(category);

        tracing::info!(
            category_id = category.id,
            pages = report.pages_fetched,
            items = report.total_count,
            failed_pages = report.failed_pages.len(),
            "Category crawl finished"
        );

        Ok(report)
    }

    /// Re-fetches only the stored pages of `category` that did not validate
    ///
    /// Pages are checked against a fresh census. The category's item count is
    /// then recomputed from storage and the category updated once.
    pub async fn retry_failed(
        &mut self,
        category: &mut Category,
    ) -> Result<CrawlReport> {
        let failed = self.storage.failed_pages(category.id)?;
        if failed.is_empty() {
            tracing::info!(category_id = category.id, "No failed pages to retry");
            let mut report = CrawlReport::new(category.id, category.item_count);
            report.total_count = category.item_count;
            return Ok(report);
        }

        tracing::info!(
            category_id = category.id,
            pages = failed.len(),
            "Retrying failed pages"
        );

        let census = get_alpha_counts(self.client, category.id).await?;
        let mut report = CrawlReport::new(category.id, census.total());

        for stored in failed {
            let Some(count) = census.get(&stored.alpha) else {
                tracing::warn!(
                    category_id = category.id,
                    alpha = %stored.alpha,
                    page = stored.page_num,
                    "Bucket no longer reported by census; skipping page"
                );
                continue;
            };

            let plan = plan_bucket(&stored.alpha, count, self.client.page_size());
            if !plan.contains(stored.page_num) {
                tracing::warn!(
                    category_id = category.id,
                    alpha = %stored.alpha,
                    page = stored.page_num,
                    pages = plan.page_count,
                    "Page beyond current bucket size; skipping"
                );
                continue;
            }

            let items = self
                .fetch_page(
                    category.id,
                    &stored.alpha,
                    stored.page_num,
                    plan.expected_count(stored.page_num),
                    &mut report,
                )
                .await;
            self.save_items(category.id, &stored.alpha, &items);
        }

        match self.storage.count_category_items(category.id) {
            Ok(count) => category.item_count = count,
            Err(e) => tracing::error!(
                category_id = category.id,
                error = %e,
                "Failed to count stored items; keeping previous item count"
            ),
        }
        report.total_count = category.item_count;
        category.last_update = Some(Utc::now());
        self.finish(category);

        tracing::info!(
            category_id = category.id,
            pages = report.pages_fetched,
            items = report.total_count,
            still_failed = report.failed_pages.len(),
            "Failed page retry finished"
        );

        Ok(report)
    }

    /// Fetches, validates and records one page, returning its tagged items
    async fn fetch_page(
        &mut self,
        category_id: i64,
        alpha: &str,
        page_num: u32,
        expected: u64,
        report: &mut CrawlReport,
    ) -> Vec<Item> {
        let mut items = get_page(self.client, category_id, alpha, page_num).await;
        let actual = items.len() as u64;
        let succeeded = actual == expected;

        report.pages_fetched += 1;
        report.total_count += actual;

        if !succeeded {
            tracing::warn!(
                category_id,
                alpha,
                page = page_num,
                expected,
                actual,
                "Page item count mismatch"
            );
            report.failed_pages.push(FailedPageRequest {
                category_id,
                alpha: alpha.to_string(),
                page_num,
                expected,
                actual,
            });
        }

        let request = PageRequest {
            category_id,
            alpha: alpha.to_string(),
            page_num,
            last_updated: Utc::now(),
            succeeded,
        };

        let page_id = match self.storage.save_page(&request, actual) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(
                    category_id,
                    alpha,
                    page = page_num,
                    error = %e,
                    "Failed to persist page record"
                );
                None
            }
        };

        for item in &mut items {
            item.category_id = category_id;
            item.item_page_id = page_id;
        }

        items
    }

    fn save_items(&mut self, category_id: i64, alpha: &str, items: &[Item]) {
        if items.is_empty() {
            return;
        }

        match self.storage.save_page_items(items) {
            Ok(()) => tracing::debug!(category_id, alpha, items = items.len(), "Saved items"),
            Err(e) => tracing::error!(
                category_id,
                alpha,
                items = items.len(),
                error = %e,
                "Failed to persist items"
            ),
        }
    }

    fn finish(&mut self, category: &Category) {
        if let Err(e) = self.storage.update_category(category) {
            tracing::error!(category_id = category.id, error = %e, "Failed to update category");
        }
    }
}
