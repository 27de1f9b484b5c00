pub mod client;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod merge;
pub mod normalize;
mod rate_limit;
pub mod refresh;
pub mod types;

pub use client::{ClientConfig, SourceClient};
pub use crawl::{CrawlConfig, CrawlOutcome, Crawler, StopReason};
pub use error::{CrawlError, ScraperError};
pub use extract::{extract_listing, ListingPage, ListingSelectors};
pub use merge::{merge_observation, MergeOutcome};
pub use normalize::normalize_entry;
pub use types::PriceInfoEntry;
