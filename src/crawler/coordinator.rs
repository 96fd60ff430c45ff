//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties everything together:
//! - Resuming from a frontier checkpoint, or crawling the seed inline
//! - Running a pool of `max_threads` workers over the shared frontier
//! - Storing new pages and admitting the links they yield
//! - Checkpointing unfinished work when the crawl is stopped
//!
//! A pool of one worker is the sequential crawler; it runs exactly the same
//! admission and budget code as a larger pool.

use crate::config::{validate_crawler_config, CrawlerConfig};
use crate::crawler::admission::Admission;
use crate::crawler::collector::{CrawlResult, ResultCollector};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::parser::Parser;
use crate::crawler::pipeline::{process_entry, PageOutcome};
use crate::ledger::DedupLedger;
use crate::stats::{CrawlStats, CrawlSummary, RunFacts};
use crate::store::ContentStore;
use crate::url::{normalize_url, CrawlScope};
use crate::{ConfigError, HarvestError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

/// Pages between two progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Results and summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Results in completion order
    pub results: Vec<CrawlResult>,
    pub summary: CrawlSummary,
}

/// Requests cancellation of a running crawl
///
/// Workers finish the page they are on and stop taking new ones. Entries
/// still queued are checkpointed to the ledger.
#[derive(Clone)]
pub struct StopHandle {
    frontier: Arc<Frontier>,
}

impl StopHandle {
    pub fn stop(&self) {
        if !self.frontier.is_stopped() {
            tracing::info!("Stop requested, finishing in-flight pages");
        }
        self.frontier.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.frontier.is_stopped()
    }
}

/// Lazily consumed crawl: results arrive as pages complete
///
/// Dropping the stream before the crawl ends stops it like a
/// [`StopHandle`]: in-flight pages finish and the rest is checkpointed.
pub struct CrawlStream {
    rx: mpsc::UnboundedReceiver<CrawlResult>,
    handle: Option<JoinHandle<Result<CrawlSummary, HarvestError>>>,
    stop: StopHandle,
}

impl CrawlStream {
    /// Next result in completion order; `None` once the crawl is over
    pub async fn next(&mut self) -> Option<CrawlResult> {
        self.rx.recv().await
    }

    /// Waits for the crawl to end and returns its summary
    ///
    /// Results not yet taken with [`CrawlStream::next`] are discarded.
    pub async fn finish(mut self) -> Result<CrawlSummary, HarvestError> {
        self.rx.close();
        let handle = self
            .handle
            .take()
            .ok_or_else(|| HarvestError::Worker("crawl already finished".to_string()))?;
        handle
            .await
            .map_err(|e| HarvestError::Worker(e.to_string()))?
    }
}

impl Drop for CrawlStream {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            if !handle.is_finished() {
                tracing::debug!("Result stream dropped while crawling");
                self.stop.stop();
            }
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    settings: CrawlerConfig,
    seed: Url,
    max_links: u64,
    max_depth: u32,
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn Parser>,
    ledger: Arc<DedupLedger>,
    store: Option<Arc<dyn ContentStore>>,
    frontier: Arc<Frontier>,
}

impl Coordinator {
    /// Creates a coordinator for one crawl
    ///
    /// Fails with [`HarvestError::Config`] if the settings or the start URL
    /// are invalid. Nothing is fetched until [`Coordinator::run`] or
    /// [`Coordinator::stream`] is called.
    pub fn new(
        settings: CrawlerConfig,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn Parser>,
        ledger: Arc<DedupLedger>,
    ) -> Result<Self, HarvestError> {
        validate_crawler_config(&settings)?;

        let seed = normalize_url(&settings.start_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", settings.start_url, e)))?;
        let max_links = u64::try_from(settings.max_links)
            .map_err(|_| ConfigError::Validation("max-links must not be negative".to_string()))?;
        let max_depth = u32::try_from(settings.max_depth).map_err(|_| {
            ConfigError::Validation(format!("max-depth {} is out of range", settings.max_depth))
        })?;

        Ok(Self {
            frontier: Frontier::new(settings.traversal),
            settings,
            seed,
            max_links,
            max_depth,
            fetcher,
            parser,
            ledger,
            store: None,
        })
    }

    /// Hands every new page to `store`, unless `skip-storage` is set
    pub fn with_content_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        if self.settings.skip_storage {
            tracing::debug!("skip-storage is set, content store will not be used");
        } else {
            self.store = Some(store);
        }
        self
    }

    /// Handle for stopping the crawl from another task
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            frontier: Arc::clone(&self.frontier),
        }
    }

    /// Normalized start URL
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Runs the crawl to completion and returns every result
    pub async fn run(self) -> Result<CrawlReport, HarvestError> {
        let collector = Arc::new(ResultCollector::buffered());
        let summary = self.execute(Arc::clone(&collector)).await?;
        Ok(CrawlReport {
            results: collector.take(),
            summary,
        })
    }

    /// Starts the crawl in the background and streams its results
    ///
    /// Must be called from within a tokio runtime.
    pub fn stream(self) -> CrawlStream {
        let (collector, rx) = ResultCollector::streaming();
        let stop = self.stop_handle();
        let handle = tokio::spawn(self.execute(Arc::new(collector)));
        CrawlStream {
            rx,
            handle: Some(handle),
            stop,
        }
    }

    async fn execute(self, collector: Arc<ResultCollector>) -> Result<CrawlSummary, HarvestError> {
        let started = Instant::now();
        tracing::info!(
            "Starting crawl of {} (max links: {}, max depth: {}, workers: {})",
            self.seed,
            self.max_links,
            self.max_depth,
            self.settings.max_threads
        );

        if !self.ledger.is_persistent() {
            tracing::info!("Ledger is memory-only, claims will not outlive this run");
        }

        let scope = CrawlScope::for_seed(&self.seed, self.settings.same_site_only);
        let ctx = Arc::new(CrawlContext {
            admission: Admission::new(
                self.max_links,
                self.max_depth,
                scope,
                Arc::clone(&self.ledger),
                Arc::clone(&self.frontier),
            ),
            fetcher: self.fetcher,
            parser: self.parser,
            store: self.store,
            ledger: Arc::clone(&self.ledger),
            frontier: Arc::clone(&self.frontier),
            collector,
            stats: CrawlStats::new(),
            include_html: self.settings.include_html,
        });

        let resumed = self.settings.resume && ctx.restore_checkpoint(self.max_depth);
        if !resumed {
            ctx.crawl_seed(&self.seed).await?;
        }

        let mut workers = JoinSet::new();
        for id in 0..self.settings.max_threads {
            workers.spawn(worker_loop(Arc::clone(&ctx), id));
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        let stopped_early = self.frontier.is_stopped();
        let pending = self.frontier.drain_pending();
        if pending.is_empty() {
            self.ledger.clear_frontier();
        } else {
            self.ledger.save_frontier(&pending);
        }

        let summary = ctx.stats.snapshot(RunFacts {
            start_url: self.seed.to_string(),
            resumed,
            links_followed: ctx.admission.links_followed(),
            pending: pending.len(),
            stopped_early,
            ledger_degraded: self.ledger.is_degraded(),
            duration: started.elapsed(),
        });

        tracing::info!(
            "Crawl finished: {} results from {} pages in {:.1}s",
            summary.results,
            summary.pages_fetched,
            started.elapsed().as_secs_f64()
        );

        Ok(summary)
    }
}

/// State shared by all workers of one crawl
struct CrawlContext {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn Parser>,
    store: Option<Arc<dyn ContentStore>>,
    ledger: Arc<DedupLedger>,
    frontier: Arc<Frontier>,
    admission: Admission,
    collector: Arc<ResultCollector>,
    stats: CrawlStats,
    include_html: bool,
}

impl CrawlContext {
    /// Refills the frontier from a checkpoint; returns false if there was none
    fn restore_checkpoint(&self, max_depth: u32) -> bool {
        let entries: Vec<FrontierEntry> = self
            .ledger
            .load_frontier()
            .into_iter()
            .filter(|entry| entry.depth <= max_depth)
            .collect();

        if entries.is_empty() {
            return false;
        }

        tracing::info!("Resuming from checkpoint with {} entries", entries.len());
        for entry in entries {
            self.frontier.push(entry);
        }
        true
    }

    /// Claims and processes the seed before any worker starts
    ///
    /// The seed does not count against the link budget.
    async fn crawl_seed(&self, seed: &Url) -> Result<(), HarvestError> {
        if !self.ledger.try_claim_url(seed.as_str()) {
            tracing::info!("Seed {} was claimed by a previous run, fetching it again", seed);
        }
        self.frontier.push(FrontierEntry::new(seed.as_str(), 0));

        // Only a stop raised before the crawl started yields no lease here
        let Some(lease) = self.frontier.pop().await else {
            return Ok(());
        };

        self.handle(&lease)
            .await
            .map_err(|e| HarvestError::SeedUnavailable {
                url: seed.to_string(),
                source: Box::new(e),
            })
    }

    /// Processes one entry: fetch, parse, dedup, store, admit links
    ///
    /// Returns the page-level error for fetch and parse failures; a store
    /// failure is logged here and does not fail the page.
    async fn handle(&self, entry: &FrontierEntry) -> Result<(), HarvestError> {
        let visited = self.stats.record_fetched();
        if visited % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} pages visited, {} results, {} in frontier",
                visited,
                self.stats.results_emitted(),
                self.frontier.len()
            );
        }

        tracing::debug!("Processing {} (depth {})", entry.url, entry.depth);
        let outcome = process_entry(
            entry,
            self.fetcher.as_ref(),
            self.parser.as_ref(),
            &self.ledger,
            self.include_html,
        )
        .await;

        match outcome {
            PageOutcome::Page { result, links } => {
                if let Some(store) = &self.store {
                    match store.store(&result).await {
                        Ok(()) => self.stats.record_stored(),
                        Err(e) => {
                            self.stats.record_store_failure();
                            tracing::warn!("Failed to store {}: {}", result.url, e);
                        }
                    }
                }

                if let Some(child_depth) = entry.depth.checked_add(1) {
                    for link in &links {
                        let decision = self.admission.try_admit(link, child_depth);
                        self.stats.record_admission(decision);
                    }
                }

                self.stats.record_result();
                self.collector.push(result);
                Ok(())
            }
            PageOutcome::Duplicate { url, content_hash } => {
                self.stats.record_duplicate();
                tracing::debug!("Duplicate content at {} (hash {})", url, content_hash);
                Ok(())
            }
            PageOutcome::FetchFailed(e) => {
                self.stats.record_fetch_failure();
                Err(e)
            }
            PageOutcome::ParseFailed(e) => {
                self.stats.record_parse_failure();
                Err(e)
            }
        }
    }
}

/// Pops and processes entries until the frontier is drained or stopped
async fn worker_loop(ctx: Arc<CrawlContext>, id: u32) {
    while let Some(lease) = ctx.frontier.pop().await {
        if let Err(e) = ctx.handle(&lease).await {
            tracing::warn!("Skipping {}: {}", lease.url, e);
        }
    }
    tracing::debug!("Worker {} finished", id);
}
