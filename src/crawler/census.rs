//! Alpha census: per-letter item counts of a category

use crate::crawler::CatalogueClient;
use crate::model::AlphaCensus;
use crate::HarvestError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CategorySummary {
    alpha: Vec<AlphaEntry>,
}

#[derive(Debug, Deserialize)]
struct AlphaEntry {
    letter: String,
    items: u64,
}

/// Fetches the category summary and returns its non-empty alpha buckets
///
/// The non-letter bucket is keyed by its query-safe token. Any failure here
/// is reported as [`HarvestError::Census`], since no page can be planned
/// without the counts.
pub async fn get_alpha_counts(
    client: &CatalogueClient,
    category_id: i64,
) -> Result<AlphaCensus, HarvestError> {
    tracing::info!(category_id, "Requesting alpha census");

    let json = client
        .fetch_json(client.summary_url(), &[("category", category_id.to_string())])
        .await
        .map_err(|e| HarvestError::Census {
            category_id,
            reason: e.to_string(),
        })?;

    let summary: CategorySummary =
        serde_json::from_value(json).map_err(|e| HarvestError::Census {
            category_id,
            reason: format!("unexpected summary payload: {}", e),
        })?;

    let mut census = AlphaCensus::new();
    for entry in summary.alpha {
        census.insert(&entry.letter, entry.items);
    }

    tracing::info!(
        category_id,
        buckets = census.len(),
        total = census.total(),
        "Alpha census complete"
    );

    Ok(census)
}
