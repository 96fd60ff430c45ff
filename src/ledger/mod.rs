//! Dedup ledger for claimed URLs and content hashes
//!
//! The ledger keeps the crawl idempotent: a URL is fetched at most once and a
//! piece of content is stored at most once, even when several workers
//! discover the same key at the same moment. Claims are decided under a
//! single mutex against an in-memory set that is authoritative for the
//! current run; a persistent backend extends the dedup across runs.
//!
//! If the backend fails, the ledger logs one warning, detaches it and keeps
//! deduplicating in memory for the rest of the run.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteLedger;
pub use traits::{LedgerError, LedgerResult, LedgerStore};

use crate::crawler::FrontierEntry;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Concurrency-safe dedup ledger
pub struct DedupLedger {
    state: Mutex<LedgerState>,
}

struct LedgerState {
    urls: HashSet<String>,
    content_hashes: HashSet<String>,
    backend: Option<Box<dyn LedgerStore>>,
    degraded: bool,
}

impl LedgerState {
    /// Runs `op` against the backend, detaching it on failure
    fn with_backend<T>(
        &mut self,
        action: &str,
        op: impl FnOnce(&mut dyn LedgerStore) -> LedgerResult<T>,
    ) -> Option<T> {
        let backend = self.backend.as_mut()?;
        match op(backend.as_mut()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    "Ledger persistence failed during {}: {}; continuing with in-memory dedup only",
                    action,
                    e
                );
                self.backend = None;
                self.degraded = true;
                None
            }
        }
    }
}

impl DedupLedger {
    /// Creates a ledger that only lives for this process
    pub fn in_memory() -> Self {
        Self::from_parts(None, false)
    }

    /// Creates a ledger persisted through `store`
    pub fn with_store(store: Box<dyn LedgerStore>) -> Self {
        Self::from_parts(Some(store), false)
    }

    /// Opens the SQLite ledger at `path`
    ///
    /// Never fails: an unusable database degrades the ledger to memory-only
    /// with a warning, since losing restart resilience is not fatal.
    pub fn open(path: &Path) -> Self {
        match SqliteLedger::new(path) {
            Ok(store) => {
                tracing::debug!("Opened ledger at {}", path.display());
                Self::with_store(Box::new(store))
            }
            Err(e) => {
                tracing::warn!(
                    "Ledger at {} is unavailable ({}); dedup will not survive a restart",
                    path.display(),
                    e
                );
                Self::from_parts(None, true)
            }
        }
    }

    fn from_parts(backend: Option<Box<dyn LedgerStore>>, degraded: bool) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                urls: HashSet::new(),
                content_hashes: HashSet::new(),
                backend,
                degraded,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claims `url`
    ///
    /// Returns true exactly once per URL for the lifetime of the ledger
    /// (and across runs while the backend is attached).
    pub fn try_claim_url(&self, url: &str) -> bool {
        let mut state = self.lock();
        if !state.urls.insert(url.to_string()) {
            return false;
        }

        match state.with_backend("URL claim", |backend| backend.insert_url(url)) {
            Some(false) => {
                tracing::debug!("URL already claimed by a previous run: {}", url);
                false
            }
            _ => true,
        }
    }

    /// Atomically claims a content hash for `url`
    pub fn try_claim_content_hash(&self, content_hash: &str, url: &str) -> bool {
        let mut state = self.lock();
        if !state.content_hashes.insert(content_hash.to_string()) {
            return false;
        }

        match state.with_backend("content hash claim", |backend| {
            backend.insert_content_hash(content_hash, url)
        }) {
            Some(false) => {
                tracing::debug!("Content of {} was stored by a previous run", url);
                false
            }
            _ => true,
        }
    }

    /// Returns true if persistence was lost and dedup is memory-only
    pub fn is_degraded(&self) -> bool {
        self.lock().degraded
    }

    /// Returns true while a persistent backend is attached
    pub fn is_persistent(&self) -> bool {
        self.lock().backend.is_some()
    }

    /// Number of URLs claimed through this ledger in this process
    pub fn claimed_url_count(&self) -> usize {
        self.lock().urls.len()
    }

    /// Number of content hashes claimed through this ledger in this process
    pub fn claimed_content_hash_count(&self) -> usize {
        self.lock().content_hashes.len()
    }

    /// Persisted (URL, content hash) counts across all runs, if persistent
    pub fn persisted_counts(&self) -> Option<(u64, u64)> {
        self.lock().with_backend("count", |backend| {
            Ok((backend.count_urls()?, backend.count_content_hashes()?))
        })
    }

    /// Checkpoints unfinished frontier entries for a later run
    pub fn save_frontier(&self, entries: &[FrontierEntry]) {
        let saved = self
            .lock()
            .with_backend("frontier checkpoint", |backend| backend.save_frontier(entries));
        if saved.is_some() {
            tracing::info!("Checkpointed {} frontier entries", entries.len());
        }
    }

    /// Loads the frontier checkpoint left by an interrupted run
    pub fn load_frontier(&self) -> Vec<FrontierEntry> {
        self.lock()
            .with_backend("frontier load", |backend| backend.load_frontier())
            .unwrap_or_default()
    }

    /// Drops any frontier checkpoint
    pub fn clear_frontier(&self) {
        self.lock()
            .with_backend("frontier clear", |backend| backend.clear_frontier());
    }

    /// Forgets every claim, in memory and in the backend
    pub fn reset(&self) {
        let mut state = self.lock();
        state.urls.clear();
        state.content_hashes.clear();
        state.with_backend("reset", |backend| backend.reset());
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for DedupLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("DedupLedger")
            .field("urls", &state.urls.len())
            .field("content_hashes", &state.content_hashes.len())
            .field("persistent", &state.backend.is_some())
            .field("degraded", &state.degraded)
            .finish()
    }
}
