//! HTTP client for the two upstream sources: the paginated catalog listing
//! (HTML) and the batched price-info endpoint (JSON).
//!
//! Handles rate limiting (429), not-found (404), and other non-2xx
//! responses as typed errors. Transient failures are retried with
//! exponential backoff; both fetches carry a transport-level timeout so a
//! stuck request cannot outlive the crawl's time budget unchecked.

use std::time::Duration;

use reqwest::Client;

use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;
use crate::types::PriceInfoEntry;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub price_info_url: String,
    /// Query parameter name repeated once per product id.
    pub price_info_param: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure; `0` disables retries.
    pub max_retries: u32,
    /// Base delay for exponential backoff: `backoff_base_secs * 2^attempt`.
    pub backoff_base_secs: u64,
}

pub struct SourceClient {
    client: Client,
    config: ClientConfig,
}

impl SourceClient {
    /// Creates a client with configured timeout, `User-Agent`, and retry
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetches one catalog listing page as raw HTML.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`] for HTTP 429 after all retries.
    /// - [`ScraperError::NotFound`] for HTTP 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`] for any other non-2xx status.
    /// - [`ScraperError::Http`] for network failure after all retries.
    pub async fn fetch_listing_page(&self, url: &str) -> Result<String, ScraperError> {
        retry_with_backoff(self.config.max_retries, self.config.backoff_base_secs, || {
            let url = url.to_owned();
            async move {
                let response = self.client.get(&url).send().await?;
                let response = Self::check_status(response, &url)?;
                Ok(response.text().await?)
            }
        })
        .await
    }

    /// Fetches structured pricing for a batch of product ids in one call.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::fetch_listing_page`], plus
    /// [`ScraperError::Deserialize`] when the body is not the expected
    /// JSON array (not retried).
    pub async fn fetch_price_info(
        &self,
        ids: &[String],
    ) -> Result<Vec<PriceInfoEntry>, ScraperError> {
        let url = self.price_info_url(ids);
        retry_with_backoff(self.config.max_retries, self.config.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self.client.get(&url).send().await?;
                let response = Self::check_status(response, &url)?;
                let body = response.text().await?;
                serde_json::from_str::<Vec<PriceInfoEntry>>(&body).map_err(|e| {
                    ScraperError::Deserialize {
                        context: format!("price info batch of {} ids", ids_len(&url)),
                        source: e,
                    }
                })
            }
        })
        .await
    }

    fn check_status(
        response: reqwest::Response,
        url: &str,
    ) -> Result<reqwest::Response, ScraperError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited {
                domain: extract_domain(url),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response)
    }

    /// Builds the batched price-info URL: the configured parameter repeated
    /// once per id, e.g. `…/price-info?ids=70000001&ids=70000002`.
    fn price_info_url(&self, ids: &[String]) -> String {
        let param = &self.config.price_info_param;
        let mut url = self.config.price_info_url.clone();
        for (index, id) in ids.iter().enumerate() {
            url.push(if index == 0 { '?' } else { '&' });
            url.push_str(param);
            url.push('=');
            url.push_str(id);
        }
        url
    }
}

/// Host part of a URL, for rate-limit reporting.
fn extract_domain(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_owned()
}

/// Number of ids encoded on a price-info URL, for error context.
fn ids_len(url: &str) -> usize {
    url.split('?')
        .nth(1)
        .map_or(0, |query| query.split('&').count())
}
