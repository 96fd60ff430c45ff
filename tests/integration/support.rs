//! Test doubles: a static link graph served by a mock fetcher and parser

use async_trait::async_trait;
use site_harvest::crawler::{CrawlResult, Fetcher, FrontierEntry, ParsedPage, Parser};
use site_harvest::ledger::{LedgerError, LedgerResult, LedgerStore};
use site_harvest::store::{ContentStore, StoreError, StoreResult};
use site_harvest::HarvestError;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE: &str = "https://site.test";

/// Absolute URL for a path on the test site
pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

struct GraphPage {
    text: String,
    links: Vec<String>,
}

/// A fixed site: every page has some text and a list of outgoing links
#[derive(Default)]
pub struct Graph {
    pages: HashMap<String, GraphPage>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page whose text is unique to it
    pub fn page(self, path: &str, links: &[&str]) -> Self {
        let text = format!("content of {}", path);
        self.page_with_text(path, &text, links)
    }

    pub fn page_with_text(mut self, path: &str, text: &str, links: &[&str]) -> Self {
        self.pages.insert(
            url(path),
            GraphPage {
                text: text.to_string(),
                links: links.iter().map(|link| url(link)).collect(),
            },
        );
        self
    }

    /// Layered site: `layers` levels of `width` pages, each linking to every
    /// page of the next level and back to the seed
    pub fn layered(layers: usize, width: usize) -> Self {
        let name = |layer: usize, i: usize| format!("/l{}/p{}", layer, i);
        let first: Vec<String> = (0..width).map(|i| name(1, i)).collect();
        let first: Vec<&str> = first.iter().map(String::as_str).collect();
        let mut graph = Self::new().page("/", &first);

        for layer in 1..=layers {
            let next: Vec<String> = if layer < layers {
                (0..width).map(|i| name(layer + 1, i)).collect()
            } else {
                Vec::new()
            };
            let mut links: Vec<&str> = next.iter().map(String::as_str).collect();
            links.push("/");
            for i in 0..width {
                graph = graph.page(&name(layer, i), &links);
            }
        }
        graph
    }
}

/// Serves pages of a [`Graph`] and counts fetches per URL
pub struct GraphFetcher {
    graph: Arc<Graph>,
    fetches: Mutex<HashMap<String, usize>>,
    failing: HashSet<String>,
    delay: Duration,
}

impl GraphFetcher {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self {
            graph,
            fetches: Mutex::new(HashMap::new()),
            failing: HashSet::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(url(path));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .get(&url(path))
            .copied()
            .unwrap_or(0)
    }

    pub fn max_fetches_per_url(&self) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .values()
            .copied()
            .max()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for GraphFetcher {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        if self.failing.contains(url) || !self.graph.pages.contains_key(url) {
            return Err(HarvestError::Fetch {
                url: url.to_string(),
                message: "HTTP 503".to_string(),
            });
        }
        Ok(format!("<graph page {}>", url))
    }
}

/// Parses pages of a [`Graph`] by looking them up
pub struct GraphParser {
    graph: Arc<Graph>,
}

impl GraphParser {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self { graph }
    }
}

impl Parser for GraphParser {
    fn parse(&self, _html: &str, page_url: &str) -> Result<ParsedPage, HarvestError> {
        let page = self
            .graph
            .pages
            .get(page_url)
            .ok_or_else(|| HarvestError::Parse {
                url: page_url.to_string(),
                message: "not in graph".to_string(),
            })?;

        Ok(ParsedPage {
            title: page_url.to_string(),
            text: page.text.clone(),
            links: page.links.clone(),
        })
    }
}

/// Content store that keeps results in memory, or fails every write
#[derive(Default)]
pub struct MemoryStore {
    pub stored: Mutex<Vec<CrawlResult>>,
    pub broken: bool,
}

impl MemoryStore {
    pub fn broken() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            broken: true,
        }
    }

    pub fn len(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn store(&self, result: &CrawlResult) -> StoreResult<()> {
        if self.broken {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.stored.lock().unwrap().push(result.clone());
        Ok(())
    }
}

/// Ledger backend whose every call fails, as a lost database would
pub struct FailingLedger;

fn lost<T>() -> LedgerResult<T> {
    Err(LedgerError::Unavailable("database is locked".to_string()))
}

impl LedgerStore for FailingLedger {
    fn insert_url(&mut self, _url: &str) -> LedgerResult<bool> {
        lost()
    }

    fn insert_content_hash(&mut self, _content_hash: &str, _url: &str) -> LedgerResult<bool> {
        lost()
    }

    fn save_frontier(&mut self, _entries: &[FrontierEntry]) -> LedgerResult<()> {
        lost()
    }

    fn load_frontier(&self) -> LedgerResult<Vec<FrontierEntry>> {
        lost()
    }

    fn clear_frontier(&mut self) -> LedgerResult<()> {
        lost()
    }

    fn reset(&mut self) -> LedgerResult<()> {
        lost()
    }

    fn count_urls(&self) -> LedgerResult<u64> {
        lost()
    }

    fn count_content_hashes(&self) -> LedgerResult<u64> {
        lost()
    }
}
