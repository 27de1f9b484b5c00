//! Bulk re-pricing of games whose discount window has lapsed.
//!
//! Crawls only see games that still appear in the catalog listing; a game
//! whose sale ended may keep its stale discount forever if it dropped off
//! the sale pages. This pass scans storage for lapsed windows and re-prices
//! them directly through the price-info endpoint, in bounded chunks.

use chrono::{DateTime, Utc};
use gamedeals_core::ListingIdentity;
use gamedeals_store::GameStore;

use crate::crawl::{merge_page, Crawler};
use crate::error::CrawlError;

impl Crawler {
    /// Re-prices every stored game whose discount window ended at or
    /// before `as_of`.
    ///
    /// Identities come from the stored records, not a fresh listing
    /// crawl. Chunks are processed sequentially with the inter-page delay
    /// between them; a failed price fetch skips its chunk with a warning
    /// rather than aborting the rest.
    ///
    /// Returns the number of expired records considered.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Store`] if the expired scan or a storage
    /// write fails.
    pub async fn refresh_expired(
        &self,
        store: &dyn GameStore,
        as_of: DateTime<Utc>,
    ) -> Result<usize, CrawlError> {
        let expired = store.list_games_with_expired_discount(as_of).await?;
        let considered = expired.len();
        if expired.is_empty() {
            tracing::info!("no expired discounts to refresh");
            return Ok(0);
        }
        tracing::info!(considered, "refreshing games with expired discounts");

        for chunk in expired.chunks(self.config().refresh_chunk_size) {
            let ids: Vec<String> = chunk.iter().map(|g| g.id.clone()).collect();
            let identities = chunk
                .iter()
                .map(|g| {
                    (
                        g.id.clone(),
                        ListingIdentity {
                            name: g.name.clone(),
                            image: g.image.clone(),
                            link: g.link.clone(),
                        },
                    )
                })
                .collect();

            let entries = match self.client().fetch_price_info(&ids).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(chunk_size = ids.len(), error = %e, "price info fetch failed, skipping chunk");
                    continue;
                }
            };

            let stats = merge_page(store, &identities, &entries).await?;
            tracing::debug!(
                chunk_size = ids.len(),
                games_written = stats.games_written,
                discount_records_written = stats.discount_records_written,
                "refreshed chunk"
            );

            tokio::time::sleep(self.config().inter_page_delay).await;
        }

        Ok(considered)
    }
}
