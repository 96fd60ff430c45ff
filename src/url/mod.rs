//! URL handling module for Site-Harvest
//!
//! Normalization gives every page a single ledger key; the crawl scope keeps
//! admission inside the seed's site.

mod normalize;
mod scope;

pub use normalize::normalize_url;
pub use scope::CrawlScope;
