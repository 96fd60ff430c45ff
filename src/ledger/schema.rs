//! Dedup ledger schema
//!
//! All statements are idempotent so an existing ledger from an earlier run is
//! opened as-is.

/// SQL schema for the ledger database
pub const SCHEMA_SQL: &str = r#"
-- URLs claimed by any run
CREATE TABLE IF NOT EXISTS claimed_urls (
    url TEXT PRIMARY KEY,
    claimed_at TEXT NOT NULL
);

-- Content hashes already handed to the content store
CREATE TABLE IF NOT EXISTS content_hashes (
    content_hash TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    claimed_at TEXT NOT NULL
);

-- Frontier left behind by an interrupted run
CREATE TABLE IF NOT EXISTS frontier_checkpoint (
    position INTEGER PRIMARY KEY,
    url TEXT NOT NULL,
    depth INTEGER NOT NULL
);
"#;

/// Initializes the ledger schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
