use thiserror::Error;

use gamedeals_store::StoreError;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid CSS selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Error surface of the crawl driver and the refresh operation.
///
/// Fetch failures mid-crawl do not surface here; the driver catches them
/// and returns the last-known cursor instead, so progress is never lost.
/// What does surface is anything that makes continuing pointless: a store
/// write failure or a broken selector configuration.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
