//! Page fetcher for the items endpoint

use crate::crawler::CatalogueClient;
use crate::model::{ApiItem, Item};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ItemsPage {
    items: Vec<Value>,
}

/// Fetches one page of a category's alpha bucket
///
/// Never fails: a request that exhausts its retries, an unexpected payload
/// and undecodable records all shrink the returned list instead, and the
/// crawler sees the shortfall as a validation mismatch for this page.
pub async fn get_page(
    client: &CatalogueClient,
    category_id: i64,
    alpha: &str,
    page_num: u32,
) -> Vec<Item> {
    let params = [
        ("category", category_id.to_string()),
        ("alpha", alpha.to_string()),
        ("page", page_num.to_string()),
    ];

    let json = match client.fetch_json(client.items_url(), &params).await {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(
                category_id,
                alpha,
                page = page_num,
                error = %e,
                "Page fetch failed; treating page as empty"
            );
            return Vec::new();
        }
    };

    let page: ItemsPage = match serde_json::from_value(json) {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!(
                category_id,
                alpha,
                page = page_num,
                error = %e,
                "Unexpected items payload; treating page as empty"
            );
            return Vec::new();
        }
    };

    page.items
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<ApiItem>(record) {
            Ok(item) => Some(item.into_item(category_id)),
            Err(e) => {
                tracing::warn!(
                    category_id,
                    alpha,
                    page = page_num,
                    error = %e,
                    "Skipping undecodable item record"
                );
                None
            }
        })
        .collect()
}
