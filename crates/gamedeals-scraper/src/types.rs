//! Wire types for the batched price-info endpoint.
//!
//! ## Observed payload shape
//!
//! The endpoint returns a JSON array, one entry per requested product id:
//!
//! ```text
//! [{"id": 70000001,
//!   "price": {
//!     "regular_price":  {"raw_value": "200.00"},
//!     "discount_price": {"raw_value": "150.00",
//!                        "start_datetime": "2024-01-01T00:00:00Z",
//!                        "end_datetime":   "2024-01-08T00:00:00Z"}}}]
//! ```
//!
//! - `id` has been observed both as a JSON number and as a string.
//! - `raw_value` is either a decimal string or a bare number; whole-unit
//!   integer parsing (with truncation) happens in `normalize`.
//! - `discount_price` is absent entirely when no promotion is active.
//! - Timestamps are usually RFC 3339 but the feed is not strict; parsing
//!   is lenient and failures normalize to absent.

use serde::Deserialize;
use serde_json::Value;

/// One entry of the price-info batch response.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceInfoEntry {
    pub id: RawId,
    #[serde(default)]
    pub price: PriceBlock,
}

/// Product id as sent by the feed: number or string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{n}"),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceBlock {
    #[serde(default)]
    pub regular_price: Option<RegularPrice>,
    #[serde(default)]
    pub discount_price: Option<DiscountPrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegularPrice {
    #[serde(default)]
    pub raw_value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountPrice {
    #[serde(default)]
    pub raw_value: Option<Value>,
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
}
