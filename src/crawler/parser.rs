//! HTML parser for extracting page content and links
//!
//! This module handles parsing HTML content to extract:
//! - The page title
//! - The readable text of the page
//! - Links to follow (from <a> tags and canonical links)

use crate::HarvestError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Title used when a page has none
pub const UNTITLED: &str = "No title";

/// Number of leading paragraphs that make up the extracted text
const PARAGRAPH_LIMIT: usize = 5;

/// Information extracted from one HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    pub title: String,

    /// Readable text; this is what the content hash is computed over
    pub text: String,

    /// Absolute http(s) links, in document order
    pub links: Vec<String>,
}

/// Turns raw HTML into a [`ParsedPage`]
///
/// Implementations must be pure: the same input yields the same output.
pub trait Parser: Send + Sync {
    fn parse(&self, html: &str, page_url: &str) -> Result<ParsedPage, HarvestError>;
}

/// scraper-based parser
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only anchors
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for HtmlParser {
    fn parse(&self, html: &str, page_url: &str) -> Result<ParsedPage, HarvestError> {
        let parse_error = |message: &str| HarvestError::Parse {
            url: page_url.to_string(),
            message: message.to_string(),
        };

        if html.trim().is_empty() {
            return Err(parse_error("Empty document"));
        }

        let base_url = Url::parse(page_url).map_err(|e| parse_error(&e.to_string()))?;
        let document = Html::parse_document(html);

        Ok(ParsedPage {
            title: extract_title(&document).unwrap_or_else(|| UNTITLED.to_string()),
            text: extract_text(&document),
            links: extract_links(&document, &base_url),
        })
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Collapses runs of whitespace into single spaces
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = selector("title")?;

    document
        .select(&title_selector)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

/// First paragraphs of the page, or the whole body when there are none
fn extract_text(document: &Html) -> String {
    let paragraphs: Vec<String> = selector("p")
        .map(|p| {
            document
                .select(&p)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .take(PARAGRAPH_LIMIT)
                .collect()
        })
        .unwrap_or_default();

    if !paragraphs.is_empty() {
        return paragraphs.join(" ");
    }

    selector("body")
        .and_then(|body| document.select(&body).next())
        .map(element_text)
        .unwrap_or_default()
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Some(a_selector) = selector("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(link) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(link);
            }
        }
    }

    if let Some(canonical_selector) = selector("link[rel='canonical'][href]") {
        links.extend(
            document
                .select(&canonical_selector)
                .filter_map(|element| element.value().attr("href"))
                .filter_map(|href| resolve_link(href, base_url)),
        );
    }

    links
}

/// Resolves an href against the page URL, keeping only http(s) targets
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
}
