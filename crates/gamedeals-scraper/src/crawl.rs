//! The crawl driver: paginates the catalog, fans observations through the
//! merge engine, and hands back a resumption cursor when cut short.
//!
//! One crawl is strictly sequential across pages (fetch, extract, price,
//! merge, delay, advance); the inter-page delay is a serialization point.
//! Within one page, per-product normalize+merge work
//! fans out concurrently and is joined before the page counts as done;
//! every write has completed by the time the driver moves on.
//!
//! The wall-clock budget is checked before each page fetch, not within a
//! page, so a single slow page may overrun the nominal budget. That is
//! accepted; the transport timeout bounds the worst case.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;

use gamedeals_core::{AppConfig, ListingIdentity};
use gamedeals_store::{GameStore, StoreError};

use crate::client::{ClientConfig, SourceClient};
use crate::error::{CrawlError, ScraperError};
use crate::extract::{extract_listing, ListingSelectors};
use crate::merge::merge_observation;
use crate::normalize::normalize_entry;
use crate::types::PriceInfoEntry;

/// Query parameter carrying the page number on listing URLs.
const PAGE_PARAM: &str = "p";

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Base URL of the paginated catalog listing.
    pub listing_url: String,
    /// Products requested per page.
    pub page_size: u32,
    /// Wall-clock budget for one crawl invocation.
    pub time_budget: Duration,
    /// Fixed delay between successive pages (and refresh chunks).
    pub inter_page_delay: Duration,
    /// Expired records re-priced per price-info call.
    pub refresh_chunk_size: usize,
}

impl CrawlConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            listing_url: config.listing_url.clone(),
            page_size: config.page_size,
            time_budget: Duration::from_secs(config.crawl_time_budget_secs),
            inter_page_delay: Duration::from_millis(config.inter_page_delay_ms),
            refresh_chunk_size: config.refresh_chunk_size,
        }
    }
}

/// Why a crawl invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The pagination control was absent: end of catalog.
    Exhausted,
    /// The extractor found zero items: end of catalog for this listing.
    EmptyPage,
    /// The wall-clock budget ran out; resume from the returned cursor.
    TimeBudget,
    /// A fetch failed after retries; resume from the returned cursor.
    FetchFailed,
}

#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub stop: StopReason,
    /// Page number to resume from, or `None` when the catalog pass is
    /// complete.
    pub next_page: Option<u32>,
    pub pages_crawled: u32,
    pub products_seen: usize,
    pub games_written: usize,
    pub discount_records_written: usize,
}

/// Bundles the source client, compiled selectors, and crawl settings.
pub struct Crawler {
    client: SourceClient,
    selectors: ListingSelectors,
    config: CrawlConfig,
}

impl Crawler {
    #[must_use]
    pub fn new(client: SourceClient, selectors: ListingSelectors, config: CrawlConfig) -> Self {
        Self {
            client,
            selectors,
            config,
        }
    }

    /// Builds a crawler from application config: constructs the HTTP
    /// client and compiles the configured selectors.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the HTTP client cannot be built or a
    /// selector string fails to compile.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ScraperError> {
        let client = SourceClient::new(ClientConfig {
            price_info_url: config.price_info_url.clone(),
            price_info_param: config.price_info_param.clone(),
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_secs: config.retry_backoff_base_secs,
        })?;
        let selectors = ListingSelectors::compile(&config.selectors)?;
        Ok(Self::new(client, selectors, CrawlConfig::from_app_config(config)))
    }

    pub(crate) fn client(&self) -> &SourceClient {
        &self.client
    }

    pub(crate) fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs one time-boxed crawl invocation starting at `start_page`.
    ///
    /// `segment` optionally narrows the crawl to one catalog segment
    /// (appended to the listing base URL as a path segment).
    ///
    /// Fetch failures are caught and reported through
    /// [`StopReason::FetchFailed`] with the last-known cursor, so an
    /// external scheduler can always resume. Store write failures
    /// propagate: continuing would silently drop observations.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Store`] if a storage write fails.
    pub async fn crawl(
        &self,
        store: &dyn GameStore,
        start_page: u32,
        segment: Option<&str>,
    ) -> Result<CrawlOutcome, CrawlError> {
        let started = Instant::now();
        let mut current_page = start_page;
        let mut url = listing_page_url(
            &self.config.listing_url,
            segment,
            self.config.page_size,
            start_page,
        );

        let mut pages_crawled = 0u32;
        let mut products_seen = 0usize;
        let mut games_written = 0usize;
        let mut discount_records_written = 0usize;

        let outcome = |stop: StopReason, next_page: Option<u32>, pages: u32, seen, games, records| {
            CrawlOutcome {
                stop,
                next_page,
                pages_crawled: pages,
                products_seen: seen,
                games_written: games,
                discount_records_written: records,
            }
        };

        loop {
            if started.elapsed() >= self.config.time_budget {
                tracing::info!(
                    next_page = current_page,
                    pages_crawled,
                    "crawl time budget spent, returning resumption cursor"
                );
                return Ok(outcome(
                    StopReason::TimeBudget,
                    Some(current_page),
                    pages_crawled,
                    products_seen,
                    games_written,
                    discount_records_written,
                ));
            }

            tracing::debug!(page = current_page, %url, "fetching listing page");
            let html = match self.client.fetch_listing_page(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(page = current_page, error = %e, "listing fetch failed, keeping cursor");
                    return Ok(outcome(
                        StopReason::FetchFailed,
                        Some(current_page),
                        pages_crawled,
                        products_seen,
                        games_written,
                        discount_records_written,
                    ));
                }
            };

            let page = extract_listing(&html, &self.selectors);
            if page.items.is_empty() {
                tracing::info!(page = current_page, "listing page has no items, catalog exhausted");
                return Ok(outcome(
                    StopReason::EmptyPage,
                    None,
                    pages_crawled,
                    products_seen,
                    games_written,
                    discount_records_written,
                ));
            }

            let ids: Vec<String> = page.items.keys().cloned().collect();
            let entries = match self.client.fetch_price_info(&ids).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(page = current_page, error = %e, "price info fetch failed, keeping cursor");
                    return Ok(outcome(
                        StopReason::FetchFailed,
                        Some(current_page),
                        pages_crawled,
                        products_seen,
                        games_written,
                        discount_records_written,
                    ));
                }
            };

            let stats = merge_page(store, &page.items, &entries).await?;
            pages_crawled += 1;
            products_seen += stats.products_seen;
            games_written += stats.games_written;
            discount_records_written += stats.discount_records_written;

            tokio::time::sleep(self.config.inter_page_delay).await;

            match page.next_url {
                None => {
                    tracing::info!(pages_crawled, "no next-page control, catalog pass complete");
                    return Ok(outcome(
                        StopReason::Exhausted,
                        None,
                        pages_crawled,
                        products_seen,
                        games_written,
                        discount_records_written,
                    ));
                }
                Some(next) => {
                    current_page = page_number(&next).unwrap_or(current_page + 1);
                    url = next;
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct PageStats {
    pub products_seen: usize,
    pub games_written: usize,
    pub discount_records_written: usize,
}

/// Normalizes and merges one batch of price-info entries.
///
/// Per-entry work targets distinct storage keys and runs concurrently;
/// the batch completes only when every write has finished. An entry whose
/// id has no listing identity is skipped with a warning; the two batches
/// are supposed to reference the same id set, and a mismatch must not
/// abort the rest.
pub(crate) async fn merge_page(
    store: &dyn GameStore,
    identities: &HashMap<String, ListingIdentity>,
    entries: &[PriceInfoEntry],
) -> Result<PageStats, StoreError> {
    let results = join_all(
        entries
            .iter()
            .map(|entry| process_entry(store, identities, entry)),
    )
    .await;

    let mut stats = PageStats {
        products_seen: entries.len(),
        ..PageStats::default()
    };
    for result in results {
        let (wrote_game, wrote_record) = result?;
        stats.games_written += usize::from(wrote_game);
        stats.discount_records_written += usize::from(wrote_record);
    }
    Ok(stats)
}

async fn process_entry(
    store: &dyn GameStore,
    identities: &HashMap<String, ListingIdentity>,
    entry: &PriceInfoEntry,
) -> Result<(bool, bool), StoreError> {
    let id = entry.id.to_string();
    let Some(identity) = identities.get(&id) else {
        tracing::warn!(game_id = %id, "price info entry has no listing identity, skipping");
        return Ok((false, false));
    };

    let fact = normalize_entry(entry);
    let stored = store.get_game(&id).await?;
    let outcome = merge_observation(&id, identity, &fact, stored.as_ref(), Utc::now());

    let mut wrote_record = false;
    if let Some(record) = &outcome.discount_record {
        store.insert_discount_record(record).await?;
        wrote_record = true;
        tracing::debug!(game_id = %id, discount_end_at = ?record.discount_end_at, "appended discount record");
    }

    let mut wrote_game = false;
    if let Some(game) = &outcome.game_record {
        store.put_game(game).await?;
        wrote_game = true;
        tracing::debug!(game_id = %id, current_price = ?game.current_price, "wrote game record");
    }

    Ok((wrote_game, wrote_record))
}

/// Builds the listing URL for one page, optionally scoped to a catalog
/// segment.
fn listing_page_url(base: &str, segment: Option<&str>, page_size: u32, page: u32) -> String {
    let base = base.trim_end_matches('/');
    match segment {
        Some(segment) => {
            format!("{base}/{segment}?product_list_limit={page_size}&{PAGE_PARAM}={page}")
        }
        None => format!("{base}?product_list_limit={page_size}&{PAGE_PARAM}={page}"),
    }
}

/// Extracts the page number from a listing URL's page query parameter.
fn page_number(url: &str) -> Option<u32> {
    let query = url.split('?').nth(1)?;
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix(PAGE_PARAM) {
            if let Some(value) = value.strip_prefix('=') {
                return value.parse().ok();
            }
        }
    }
    None
}
