//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the catalogue API and a SQLite
//! file in a temp directory to check the full harvest cycle end-to-end.

use catalogue_harvest::config::{load_config_with_hash, ApiConfig};
use catalogue_harvest::crawler::{harvest, CatalogueClient, HarvestMode, RetryPolicy};
use catalogue_harvest::model::Category;
use catalogue_harvest::storage::{RunStatus, SqliteStorage};
use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_client(base_url: &str) -> CatalogueClient {
    let api = ApiConfig {
        summary_url: format!("{}/category.json", base_url),
        items_url: format!("{}/items.json", base_url),
        page_size: 12,
        request_timeout: 5,
        connect_timeout: 5,
    };
    let policy = RetryPolicy {
        max_attempts: 2,
        retry_wait: Duration::ZERO,
        cooldown_after: 5,
        cooldown: Duration::ZERO,
    };
    CatalogueClient::new(reqwest::Client::new(), &api, policy)
}

fn create_storage(dir: &TempDir, categories: &[Category]) -> SqliteStorage {
    let mut storage = SqliteStorage::new(&dir.path().join("harvest.db")).unwrap();
    storage.seed_categories(categories).unwrap();
    storage
}

fn items_body(first_id: i64, count: usize) -> Value {
    let items: Vec<Value> = (0..count as i64)
        .map(|n| {
            let members = if n % 2 == 0 { "true" } else { "false" };
            json!({
                "id": first_id + n,
                "name": format!("Item {}", first_id + n),
                "description": "An item.",
                "type": "Misc",
                "members": members
            })
        })
        .collect();
    json!({ "total": count, "items": items })
}

async fn mount_census(server: &MockServer, category_id: i64, alpha: Value) {
    Mock::given(method("GET"))
        .and(path("/category.json"))
        .and(query_param("category", category_id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "alpha": alpha })))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, category_id: i64, alpha: &str, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/items.json"))
        .and(query_param("category", category_id.to_string()))
        .and(query_param("alpha", alpha))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts category 1 with buckets a=14 and b=12
///
/// When `short_first` is set the first request for a/2 returns one item
/// instead of two; later requests return the full page.
async fn mount_bows(server: &MockServer, short_first: bool) {
    mount_census(
        server,
        1,
        json!([{ "letter": "a", "items": 14 }, { "letter": "b", "items": 12 }]),
    )
    .await;
    mount_page(server, 1, "a", 1, items_body(1, 12)).await;

    if short_first {
        Mock::given(method("GET"))
            .and(path("/items.json"))
            .and(query_param("category", "1"))
            .and(query_param("alpha", "a"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items_body(13, 1)))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
    mount_page(server, 1, "a", 2, items_body(13, 2)).await;
    mount_page(server, 1, "b", 1, items_body(100, 12)).await;
}

#[tokio::test]
async fn test_full_harvest_then_retry_failed() {
    let server = MockServer::start().await;
    mount_bows(&server, true).await;

    let dir = TempDir::new().unwrap();
    let mut storage = create_storage(&dir, &[Category::new(1, "Bows")]);
    let client = create_client(&server.uri());

    let categories = vec![storage.get_category(1).unwrap()];
    let summary = harvest(
        &client,
        &mut storage,
        categories,
        HarvestMode::Full,
    )
    .await;

    assert!(summary.aborted.is_empty());
    assert_eq!(summary.failed_page_count(), 1);
    assert_eq!(summary.total_items(), 25);

    let category = storage.get_category(1).unwrap();
    assert_eq!(category.item_count, 25);
    assert!(category.last_update.is_some());
    assert_eq!(storage.category_items(1).unwrap().len(), 25);

    let failed = storage.list_failed_pages().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].alpha, "a");
    assert_eq!(failed[0].page_num, 2);
    assert_eq!(failed[0].item_count, 1);

    // Items point at the page request that produced them
    let short_page = storage.get_page(1, "a", 2).unwrap().unwrap();
    let items = storage.category_items(1).unwrap();
    let item_13 = items.iter().find(|i| i.id == 13).unwrap();
    assert_eq!(item_13.item_page_id, Some(short_page.id));
    assert!(item_13.members_only);

    let categories = vec![storage.get_category(1).unwrap()];
    let summary = harvest(
        &client,
        &mut storage,
        categories,
        HarvestMode::RetryFailed,
    )
    .await;

    assert!(summary.is_complete());
    assert_eq!(summary.reports[0].pages_fetched, 1);
    assert!(storage.list_failed_pages().unwrap().is_empty());

    let retried = storage.get_page(1, "a", 2).unwrap().unwrap();
    assert_eq!(retried.id, short_page.id);
    assert!(retried.succeeded);
    assert_eq!(retried.item_count, 2);

    assert_eq!(storage.get_category(1).unwrap().item_count, 26);
    assert_eq!(storage.count_items().unwrap(), 26);
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let server = MockServer::start().await;
    mount_bows(&server, false).await;

    let dir = TempDir::new().unwrap();
    let mut storage = create_storage(&dir, &[Category::new(1, "Bows")]);
    let client = create_client(&server.uri());

    for _ in 0..2 {
        let categories = vec![storage.get_category(1).unwrap()];
        let summary = harvest(
            &client,
            &mut storage,
            categories,
            HarvestMode::Full,
        )
        .await;
        assert!(summary.is_complete());
    }

    assert_eq!(storage.count_items().unwrap(), 26);
    assert_eq!(storage.page_outcome_counts(1).unwrap(), (3, 0));
    assert_eq!(storage.get_category(1).unwrap().item_count, 26);
}

#[tokio::test]
async fn test_census_failure_does_not_stop_other_categories() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/category.json"))
        .and(query_param("category", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_census(&server, 3, json!([{ "letter": "#", "items": 2 }])).await;
    mount_page(&server, 3, "#", 1, items_body(500, 2)).await;

    let dir = TempDir::new().unwrap();
    let mut storage = create_storage(
        &dir,
        &[Category::new(2, "Broken"), Category::new(3, "Runes")],
    );
    let client = create_client(&server.uri());

    let categories = storage.load_categories().unwrap();
    let summary = harvest(&client, &mut storage, categories, HarvestMode::Full).await;

    assert_eq!(summary.aborted.len(), 1);
    assert_eq!(summary.aborted[0].0, 2);
    assert_eq!(summary.reports.len(), 1);
    assert!(summary.reports[0].is_complete());

    let broken = storage.get_category(2).unwrap();
    assert_eq!(broken.item_count, 0);
    assert!(broken.last_update.is_none());
    assert_eq!(storage.page_outcome_counts(2).unwrap(), (0, 0));

    assert_eq!(storage.get_category(3).unwrap().item_count, 2);
    assert!(storage.get_page(3, "%23", 1).unwrap().unwrap().succeeded);
}

#[tokio::test]
async fn test_harvest_from_config_records_run() {
    let server = MockServer::start().await;
    mount_bows(&server, false).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("configured.db");

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[api]
summary-url = "{uri}/category.json"
items-url = "{uri}/items.json"

[retry]
max-attempts = 2
retry-wait = 0
cooldown = 0

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
database-path = "{db}"

[[category]]
id = 1
name = "Bows"
"#,
        uri = server.uri(),
        db = db_path.display()
    )
    .unwrap();
    file.flush().unwrap();

    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    let client = CatalogueClient::from_config(&config).unwrap();
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    let seeded: Vec<Category> = config.categories.iter().map(Category::from).collect();
    storage.seed_categories(&seeded).unwrap();

    let run_id = storage.create_run(&hash).unwrap();
    let summary = harvest(&client, &mut storage, seeded, HarvestMode::Full).await;
    storage
        .finish_run(run_id, RunStatus::Completed, summary.failed_page_count() as u64)
        .unwrap();

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, hash);
    assert_eq!(run.failed_pages, 0);
    assert!(run.finished_at.is_some());

    assert_eq!(storage.get_category(1).unwrap().item_count, 26);
}
