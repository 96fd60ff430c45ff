//! SQLite ledger backend

use crate::crawler::FrontierEntry;
use crate::ledger::schema::initialize_schema;
use crate::ledger::traits::{LedgerResult, LedgerStore};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite-backed ledger
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Opens or creates the ledger database at `path`
    pub fn new(path: &Path) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory ledger database
    pub fn new_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl LedgerStore for SqliteLedger {
    fn insert_url(&mut self, url: &str) -> LedgerResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO claimed_urls (url, claimed_at) VALUES (?1, ?2)",
            params![url, now],
        )?;
        Ok(inserted == 1)
    }

    fn insert_content_hash(&mut self, content_hash: &str, url: &str) -> LedgerResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO content_hashes (content_hash, url, claimed_at) VALUES (?1, ?2, ?3)",
            params![content_hash, url, now],
        )?;
        Ok(inserted == 1)
    }

    fn save_frontier(&mut self, entries: &[FrontierEntry]) -> LedgerResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM frontier_checkpoint", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO frontier_checkpoint (position, url, depth) VALUES (?1, ?2, ?3)",
            )?;
            for (position, entry) in entries.iter().enumerate() {
                stmt.execute(params![position as i64, entry.url, entry.depth])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_frontier(&self) -> LedgerResult<Vec<FrontierEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, depth FROM frontier_checkpoint ORDER BY position")?;

        let entries = stmt
            .query_map([], |row| {
                Ok(FrontierEntry {
                    url: row.get(0)?,
                    depth: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn clear_frontier(&mut self) -> LedgerResult<()> {
        self.conn.execute("DELETE FROM frontier_checkpoint", [])?;
        Ok(())
    }

    fn reset(&mut self) -> LedgerResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM claimed_urls;
            DELETE FROM content_hashes;
            DELETE FROM frontier_checkpoint;
        ",
        )?;
        Ok(())
    }

    fn count_urls(&self) -> LedgerResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM claimed_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_content_hashes(&self) -> LedgerResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM content_hashes", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
