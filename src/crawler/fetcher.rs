//! Page fetching
//!
//! The coordinator only sees the [`Fetcher`] trait. [`HttpFetcher`] is the
//! production implementation on top of reqwest; tests substitute their own.

use crate::config::UserAgentConfig;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Retrieves the HTML of a page
///
/// Implementations must be safe to call from several workers at once. Every
/// failure (network error, timeout, non-2xx status, non-HTML body) is
/// reported as [`HarvestError::Fetch`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError>;
}

/// Builds an HTTP client with proper configuration
///
/// The user agent has the form `CrawlerName/Version (+ContactURL; ContactEmail)`.
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }
}

fn fetch_error(url: &str, message: impl Into<String>) -> HarvestError {
    HarvestError::Fetch {
        url: url.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                fetch_error(url, "Request timeout")
            } else if e.is_connect() {
                fetch_error(url, "Connection refused")
            } else if e.is_redirect() {
                fetch_error(url, format!("Redirect error: {}", e))
            } else {
                fetch_error(url, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(url, format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        // A missing header is given the benefit of the doubt
        if !content_type.is_empty()
            && !content_type.contains("text/html")
            && !content_type.contains("application/xhtml+xml")
        {
            return Err(fetch_error(
                url,
                format!("Not an HTML page (Content-Type: {})", content_type),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| fetch_error(url, format!("Failed to read body: {}", e)))
    }
}
