//! Content store for extracted pages
//!
//! The crawler hands every new page to a [`ContentStore`]. A store failure is
//! logged and counted but never stops the crawl or suppresses the result.

mod sqlite;

pub use sqlite::{SqliteContentStore, StoredPage};

use crate::crawler::CrawlResult;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by content store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persists crawl results
///
/// Must tolerate concurrent calls from several workers.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn store(&self, result: &CrawlResult) -> StoreResult<()>;
}
