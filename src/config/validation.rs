use crate::config::types::{Config, CrawlerConfig, OutputConfig, Traversal, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
const MAX_THREADS_LIMIT: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output, config.crawler.skip_storage)?;
    Ok(())
}

/// Validates the crawl budgets and seed URL
///
/// Called by the coordinator as well, so a programmatically built
/// configuration fails before any worker is started.
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let start = Url::parse(&config.start_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid start_url '{}': {}", config.start_url, e))
    })?;

    if start.scheme() != "http" && start.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' must use http or https",
            config.start_url
        )));
    }

    if start.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' has no host",
            config.start_url
        )));
    }

    if config.max_links < 0 {
        return Err(ConfigError::Validation(format!(
            "max_links must be >= 0, got {}",
            config.max_links
        )));
    }

    if config.max_depth < 0 || config.max_depth > i64::from(u32::MAX) {
        return Err(ConfigError::Validation(format!(
            "max_depth must be between 0 and {}, got {}",
            u32::MAX,
            config.max_depth
        )));
    }

    if config.max_threads < 1 || config.max_threads > MAX_THREADS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_threads must be between 1 and {}, got {}",
            MAX_THREADS_LIMIT, config.max_threads
        )));
    }

    if config.traversal == Traversal::DepthFirst && config.max_threads != 1 {
        return Err(ConfigError::Validation(format!(
            "depth-first traversal requires max_threads = 1, got {}",
            config.max_threads
        )));
    }

    if config.fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Checks that the user agent names the crawler and carries a contact URL
/// and email
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    let name = &config.crawler_name;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "crawler-name must be a non-empty token of letters, digits and hyphens, got '{}'",
            name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("contact-url '{}': {}", config.contact_url, e)))?;

    validate_email(&config.contact_email)
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig, skip_storage: bool) -> Result<(), ConfigError> {
    if config.ledger_path.is_empty() {
        return Err(ConfigError::Validation(
            "ledger_path cannot be empty".to_string(),
        ));
    }

    if !skip_storage && config.content_path.is_empty() {
        return Err(ConfigError::Validation(
            "content_path cannot be empty unless skip_storage is set".to_string(),
        ));
    }

    Ok(())
}

/// Accepts addresses of the form `local@host.tld`
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
    });

    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "contact-email '{}' is not a valid address",
            email
        )))
    }
}
