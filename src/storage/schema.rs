//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Catalogue categories and their aggregate counts
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    item_count INTEGER NOT NULL DEFAULT 0,
    last_update TEXT
);

-- One row per (category, alpha, page) ever fetched
CREATE TABLE IF NOT EXISTS page_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id INTEGER NOT NULL REFERENCES categories(id),
    alpha TEXT NOT NULL,
    page_num INTEGER NOT NULL,
    last_updated TEXT NOT NULL,
    succeeded INTEGER NOT NULL DEFAULT 0,
    item_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE(category_id, alpha, page_num)
);

CREATE INDEX IF NOT EXISTS idx_page_requests_outcome ON page_requests(category_id, succeeded);

-- Harvested items, keyed by upstream id
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY,
    category_id INTEGER NOT NULL REFERENCES categories(id),
    item_page_id INTEGER REFERENCES page_requests(id),
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    type TEXT NOT NULL,
    members_only INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_category ON items(category_id);
CREATE INDEX IF NOT EXISTS idx_items_page ON items(item_page_id);

-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    failed_pages INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
