//! Ledger backend trait and error types

use crate::crawler::FrontierEntry;
use thiserror::Error;

/// Errors that can occur in a ledger backend
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Ledger backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Durable record of claimed URLs and content hashes
///
/// The insert operations report whether the key was new, so a backend shared
/// with earlier runs can refuse keys those runs already claimed. Callers
/// serialize access; implementations need not be `Sync`.
pub trait LedgerStore: Send {
    /// Records a URL; returns false if it was already recorded
    fn insert_url(&mut self, url: &str) -> LedgerResult<bool>;

    /// Records a content hash for `url`; returns false if it was already recorded
    fn insert_content_hash(&mut self, content_hash: &str, url: &str) -> LedgerResult<bool>;

    /// Replaces the frontier checkpoint with `entries`, in order
    fn save_frontier(&mut self, entries: &[FrontierEntry]) -> LedgerResult<()>;

    /// Loads the frontier checkpoint, in the order it was saved
    fn load_frontier(&self) -> LedgerResult<Vec<FrontierEntry>>;

    /// Removes the frontier checkpoint
    fn clear_frontier(&mut self) -> LedgerResult<()>;

    /// Forgets every claim and the checkpoint
    fn reset(&mut self) -> LedgerResult<()>;

    /// Number of URLs recorded across all runs
    fn count_urls(&self) -> LedgerResult<u64>;

    /// Number of content hashes recorded across all runs
    fn count_content_hashes(&self) -> LedgerResult<u64>;
}
