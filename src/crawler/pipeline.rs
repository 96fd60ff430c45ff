//! Processing of a single frontier entry: fetch, parse, dedup by content

use crate::crawler::collector::CrawlResult;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::FrontierEntry;
use crate::crawler::parser::Parser;
use crate::ledger::DedupLedger;
use crate::HarvestError;
use sha2::{Digest, Sha256};

/// What became of one fetched entry
#[derive(Debug)]
pub enum PageOutcome {
    /// New content; `links` are the admission candidates it yields
    Page {
        result: CrawlResult,
        links: Vec<String>,
    },
    /// Content already claimed under another URL
    Duplicate { url: String, content_hash: String },
    FetchFailed(HarvestError),
    ParseFailed(HarvestError),
}

/// Lowercase hex SHA-256 of the extracted text
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Fetches, parses and content-deduplicates one entry
pub async fn process_entry(
    entry: &FrontierEntry,
    fetcher: &dyn Fetcher,
    parser: &dyn Parser,
    ledger: &DedupLedger,
    include_html: bool,
) -> PageOutcome {
    let html = match fetcher.fetch(&entry.url).await {
        Ok(html) => html,
        Err(e) => return PageOutcome::FetchFailed(e),
    };

    let page = match parser.parse(&html, &entry.url) {
        Ok(page) => page,
        Err(e) => return PageOutcome::ParseFailed(e),
    };

    let hash = content_hash(&page.text);
    if !ledger.try_claim_content_hash(&hash, &entry.url) {
        return PageOutcome::Duplicate {
            url: entry.url.clone(),
            content_hash: hash,
        };
    }

    PageOutcome::Page {
        result: CrawlResult {
            title: page.title,
            content: page.text,
            html: include_html.then_some(html),
            url: entry.url.clone(),
            depth: entry.depth,
            content_hash: hash,
        },
        links: page.links,
    }
}
