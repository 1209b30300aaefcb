//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Entities are mapped to and from rows by the explicit `*_from_row`
//! functions below; column lists and mappers must stay in the same order.

use crate::model::{Category, Item, PageRequest, StoredPage};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const CATEGORY_COLUMNS: &str = "id, name, item_count, last_update";
const PAGE_COLUMNS: &str = "id, category_id, alpha, page_num, last_updated, succeeded, item_count";
const ITEM_COLUMNS: &str =
    "id, category_id, item_page_id, name, description, type, members_only";
const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, failed_pages";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and ensures the schema exists
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Categories =====

    /// Registers categories, renaming known ones without touching their counts
    pub fn seed_categories(&mut self, categories: &[Category]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut touched = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO categories (id, name, item_count, last_update) VALUES (?1, ?2, 0, NULL)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            )?;
            for category in categories {
                touched += stmt.execute(params![category.id, category.name])?;
            }
        }
        tx.commit()?;
        Ok(touched)
    }

    /// Loads every known category ordered by id
    pub fn load_categories(&self) -> StorageResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM categories ORDER BY id",
            CATEGORY_COLUMNS
        ))?;

        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    pub fn get_category(&self, category_id: i64) -> StorageResult<Category> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM categories WHERE id = ?1", CATEGORY_COLUMNS),
                params![category_id],
                category_from_row,
            )
            .optional()?
            .ok_or(StorageError::CategoryNotFound(category_id))
    }

    // ===== Pages =====

    /// Gets the stored record for one page identity
    pub fn get_page(
        &self,
        category_id: i64,
        alpha: &str,
        page_num: u32,
    ) -> StorageResult<Option<StoredPage>> {
        let page = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM page_requests WHERE category_id = ?1 AND alpha = ?2 AND page_num = ?3",
                    PAGE_COLUMNS
                ),
                params![category_id, alpha, page_num],
                page_from_row,
            )
            .optional()?;

        Ok(page)
    }

    /// All pages that did not validate, across every category
    pub fn list_failed_pages(&self) -> StorageResult<Vec<StoredPage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM page_requests WHERE succeeded = 0 ORDER BY category_id, id",
            PAGE_COLUMNS
        ))?;

        let pages = stmt
            .query_map([], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    /// Counts `(succeeded, failed)` page records of a category
    pub fn page_outcome_counts(&self, category_id: i64) -> StorageResult<(u64, u64)> {
        let (succeeded, failed): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(succeeded != 0), 0), COALESCE(SUM(succeeded = 0), 0)
             FROM page_requests WHERE category_id = ?1",
            params![category_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((succeeded as u64, failed as u64))
    }

    // ===== Items =====

    /// Items of a category ordered by id
    pub fn category_items(&self, category_id: i64) -> StorageResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM items WHERE category_id = ?1 ORDER BY id",
            ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![category_id], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn count_items(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    /// Creates a new harvest run
    pub fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Marks a run as finished with the given status
    pub fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        failed_pages: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, failed_pages = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, failed_pages as i64, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets the most recent run
    pub fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Running),
                        failed_pages: row.get::<_, i64>(5)? as u64,
                    })
                },
            )
            .optional()?;

        Ok(run)
    }
}

impl Storage for SqliteStorage {
    fn save_page_items(&mut self, items: &[Item]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO items (id, category_id, item_page_id, name, description, type, members_only)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    category_id = excluded.category_id,
                    item_page_id = excluded.item_page_id,
                    name = excluded.name,
                    description = excluded.description,
                    type = excluded.type,
                    members_only = excluded.members_only",
            )?;

            for item in items {
                stmt.execute(params![
                    item.id,
                    item.category_id,
                    item.item_page_id,
                    item.name,
                    item.description,
                    item.item_type,
                    item.members_only,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn save_page(&mut self, page: &PageRequest, actual_item_count: u64) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;

        let existing: Option<(i64, bool, i64)> = tx
            .query_row(
                "SELECT id, succeeded, item_count FROM page_requests
                 WHERE category_id = ?1 AND alpha = ?2 AND page_num = ?3",
                params![page.category_id, page.alpha, page.page_num],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let last_updated = page.last_updated.to_rfc3339();

        let page_id = match existing {
            Some((id, succeeded, stored)) => {
                let stored = stored as u64;
                if succeeded && actual_item_count < stored {
                    return Err(StorageError::Regression {
                        category_id: page.category_id,
                        alpha: page.alpha.clone(),
                        page_num: page.page_num,
                        stored,
                        actual: actual_item_count,
                    });
                }

                tx.execute(
                    "UPDATE page_requests SET last_updated = ?1, succeeded = ?2, item_count = ?3
                     WHERE id = ?4",
                    params![last_updated, page.succeeded, actual_item_count as i64, id],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO page_requests
                     (category_id, alpha, page_num, last_updated, succeeded, item_count)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        page.category_id,
                        page.alpha,
                        page.page_num,
                        last_updated,
                        page.succeeded,
                        actual_item_count as i64,
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        Ok(page_id)
    }

    fn update_category(&mut self, category: &Category) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO categories (id, name, item_count, last_update) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                item_count = excluded.item_count,
                last_update = excluded.last_update",
            params![
                category.id,
                category.name,
                category.item_count as i64,
                category.last_update.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn failed_pages(&self, category_id: i64) -> StorageResult<Vec<StoredPage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM page_requests WHERE category_id = ?1 AND succeeded = 0 ORDER BY id",
            PAGE_COLUMNS
        ))?;

        let pages = stmt
            .query_map(params![category_id], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn count_category_items(&self, category_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE category_id = ?1",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    let last_update = match row.get::<_, Option<String>>(3)? {
        Some(value) => Some(parse_timestamp(3, &value)?),
        None => None,
    };

    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        item_count: row.get::<_, i64>(2)? as u64,
        last_update,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<StoredPage> {
    Ok(StoredPage {
        id: row.get(0)?,
        category_id: row.get(1)?,
        alpha: row.get(2)?,
        page_num: row.get(3)?,
        last_updated: parse_timestamp(4, &row.get::<_, String>(4)?)?,
        succeeded: row.get(5)?,
        item_count: row.get::<_, i64>(6)? as u64,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        category_id: row.get(1)?,
        item_page_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        item_type: row.get(5)?,
        members_only: row.get(6)?,
    })
}
