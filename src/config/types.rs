use serde::Deserialize;

/// Main configuration structure for Site-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Order in which the frontier hands out work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Traversal {
    /// FIFO: shallower pages are exhausted before deeper ones
    #[default]
    BreadthFirst,
    /// LIFO: only allowed with a single worker
    DepthFirst,
}

/// Crawl budget and behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the crawl starts from (depth 0)
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum number of links admitted to the frontier, excluding the seed
    #[serde(rename = "max-links", default = "default_max_links")]
    pub max_links: i64,

    /// Maximum number of link hops from the seed
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: i64,

    /// Number of concurrent workers (1 = sequential crawl)
    #[serde(rename = "max-threads", default = "default_max_threads")]
    pub max_threads: u32,

    /// Do not hand pages to the content store
    #[serde(rename = "skip-storage", default)]
    pub skip_storage: bool,

    #[serde(default)]
    pub traversal: Traversal,

    /// Keep the raw HTML on each result
    #[serde(rename = "include-html", default)]
    pub include_html: bool,

    /// Only follow links under the start URL's origin and path
    #[serde(rename = "same-site-only", default = "default_true")]
    pub same_site_only: bool,

    /// Continue from a frontier checkpoint left by an interrupted run
    #[serde(default = "default_true")]
    pub resume: bool,

    /// Per-request timeout for the HTTP fetcher (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl CrawlerConfig {
    /// Creates a crawler configuration with default budgets for `start_url`
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_links: default_max_links(),
            max_depth: default_max_depth(),
            max_threads: default_max_threads(),
            skip_storage: false,
            traversal: Traversal::default(),
            include_html: false,
            same_site_only: true,
            resume: true,
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite dedup ledger
    #[serde(rename = "ledger-path", default = "default_ledger_path")]
    pub ledger_path: String,

    /// Path to the SQLite content store
    #[serde(rename = "content-path", default = "default_content_path")]
    pub content_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            content_path: default_content_path(),
        }
    }
}

fn default_max_links() -> i64 {
    30
}

fn default_max_depth() -> i64 {
    10
}

fn default_max_threads() -> u32 {
    3
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_ledger_path() -> String {
    "./harvest_ledger.db".to_string()
}

fn default_content_path() -> String {
    "./harvest_content.db".to_string()
}
