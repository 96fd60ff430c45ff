//! SQLite content store

use crate::crawler::CrawlResult;
use crate::store::{ContentStore, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS pages (
        url TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        depth INTEGER NOT NULL,
        content_hash TEXT NOT NULL,
        stored_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_pages_content_hash ON pages(content_hash);
";

/// A page as read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub depth: u32,
    pub content_hash: String,
    pub stored_at: String,
}

/// SQLite-backed content store
pub struct SqliteContentStore {
    conn: Mutex<Connection>,
}

impl SqliteContentStore {
    /// Opens or creates the content database at `path`
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory content database
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces one page
    pub fn insert_page(&self, result: &CrawlResult) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT OR REPLACE INTO pages (url, title, content, depth, content_hash, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                result.url,
                result.title,
                result.content,
                result.depth,
                result.content_hash,
                now
            ],
        )?;
        Ok(())
    }

    pub fn count_pages(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn get_page(&self, url: &str) -> StoreResult<Option<StoredPage>> {
        let page = self
            .conn()
            .query_row(
                "SELECT url, title, content, depth, content_hash, stored_at FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok(StoredPage {
                        url: row.get(0)?,
                        title: row.get(1)?,
                        content: row.get(2)?,
                        depth: row.get(3)?,
                        content_hash: row.get(4)?,
                        stored_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(page)
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn store(&self, result: &CrawlResult) -> StoreResult<()> {
        self.insert_page(result)
    }
}
