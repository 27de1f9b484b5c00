//! Domain types shared across the crawl pipeline, store, and API.
//!
//! `GameRecord` and `DiscountRecord` serialize in camelCase because the
//! browser front-end consumes them verbatim (`currentPrice`,
//! `discountStartAt`, ...). Prices are whole currency units (`i64`);
//! fractional raw feed values are truncated during normalization, never
//! rounded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity facts for one product as extracted from a catalog listing page.
///
/// Ephemeral: lives for one page's extraction pass and is consumed by the
/// price-info step. The image URL comes from a lazy-loading `data-src`
/// attribute and may be absent on malformed tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingIdentity {
    pub name: String,
    pub image: Option<String>,
    pub link: Option<String>,
}

/// Normalized pricing facts for one product in one crawl cycle.
///
/// All fields are optional: the upstream price feed omits blocks freely and
/// malformed values normalize to absent rather than erroring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceFact {
    pub regular_price: Option<i64>,
    pub discount_price: Option<i64>,
    pub discount_start_at: Option<DateTime<Utc>>,
    pub discount_end_at: Option<DateTime<Utc>>,
}

impl PriceFact {
    /// The price a buyer pays right now: the discount price while a
    /// promotion is active, otherwise the regular price.
    #[must_use]
    pub fn current_price(&self) -> Option<i64> {
        self.discount_price.or(self.regular_price)
    }

    /// Percentage off the regular price, rounded to the nearest integer.
    ///
    /// Only defined when both prices are present and the regular price is
    /// positive; `round(100 - discount * 100 / regular)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn discount_rate(&self) -> Option<i64> {
        match (self.discount_price, self.regular_price) {
            (Some(discount), Some(regular)) if regular > 0 => {
                let rate = 100.0 - (discount as f64) * 100.0 / (regular as f64);
                Some(rate.round() as i64)
            }
            _ => None,
        }
    }
}

/// The current-state record for one product, keyed by its storefront id.
///
/// `cheapest_price` is a historical floor: the lowest `current_price` ever
/// observed for this id. It is monotonically non-increasing once set and is
/// retained even after a promotion ends, alongside the discount-end
/// timestamp that was active when the floor was set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub link: Option<String>,
    pub current_price: Option<i64>,
    pub regular_price: Option<i64>,
    pub discount_rate: Option<i64>,
    pub discount_start_at: Option<DateTime<Utc>>,
    pub discount_end_at: Option<DateTime<Utc>>,
    pub cheapest_price: Option<i64>,
    pub cheapest_price_end_at: Option<DateTime<Utc>>,
}

/// One entry in the append-only price-history ledger.
///
/// A record marks the observation of a distinct promotion window (a new or
/// changed `discount_end_at`). Records are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRecord {
    pub id: Uuid,
    pub game_id: String,
    pub regular_price: Option<i64>,
    pub discount_price: i64,
    pub discount_rate: Option<i64>,
    pub discount_start_at: Option<DateTime<Utc>>,
    pub discount_end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
