use url::Url;

/// The part of the web a crawl is allowed to follow links into
#[derive(Debug, Clone)]
pub enum CrawlScope {
    /// Same scheme, host and port as the seed, under the seed's path
    Site { origin: url::Origin, path: String },
    /// Any http(s) URL
    Anywhere,
}

impl CrawlScope {
    /// Builds the scope for a normalized seed URL
    pub fn for_seed(seed: &Url, same_site_only: bool) -> Self {
        if same_site_only {
            Self::Site {
                origin: seed.origin(),
                path: seed.path().to_string(),
            }
        } else {
            Self::Anywhere
        }
    }

    /// Returns true if a normalized URL falls inside this scope
    ///
    /// Path containment is segment-wise, so a seed at `/docs` covers
    /// `/docs/intro` but not `/docs-old`.
    pub fn contains(&self, url: &Url) -> bool {
        match self {
            Self::Anywhere => true,
            Self::Site { origin, path } => {
                if &url.origin() != origin {
                    return false;
                }
                let candidate = url.path();
                path == "/"
                    || candidate == path
                    || candidate
                        .strip_prefix(path.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}
