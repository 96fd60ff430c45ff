//! Crawler module for the crawl coordinator and its collaborators
//!
//! This module contains the core crawling logic, including:
//! - The link frontier shared by all workers
//! - Admission of discovered links under the depth and link budgets
//! - HTTP fetching and HTML parsing behind swappable traits
//! - Result collection, buffered or streamed
//! - Overall crawl coordination

mod admission;
mod collector;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod pipeline;

pub use admission::{Admission, AdmissionDecision};
pub use collector::{CrawlResult, ResultCollector};
pub use coordinator::{Coordinator, CrawlReport, CrawlStream, StopHandle};
pub use fetcher::{build_http_client, Fetcher, HttpFetcher};
pub use frontier::{Frontier, FrontierEntry, Lease};
pub use parser::{HtmlParser, ParsedPage, Parser, UNTITLED};
pub use pipeline::{content_hash, process_entry, PageOutcome};
