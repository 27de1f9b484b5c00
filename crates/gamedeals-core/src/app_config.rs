use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// CSS selector strings driving the listing extractor.
///
/// The storefront serves two catalog layouts: a category layout and the
/// plain product grid. The primary container selector is tried first and
/// the fallback is used when it yields zero matches, so both layouts flow
/// through one extraction pass. Every string is overridable through
/// `GAMEDEALS_SEL_*` so a markup change does not require a code change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    /// Container for one catalog tile in the category layout.
    pub item_primary: String,
    /// Container for one catalog tile in the product-grid layout.
    pub item_fallback: String,
    /// Element inside a tile whose `href` carries the product link; the
    /// trailing path segment of that link is the product id.
    pub link: String,
    /// Element whose `data-src` attribute carries the product image URL.
    pub image: String,
    /// Element whose trimmed text is the product display name.
    pub name: String,
    /// Pagination control carrying the next-page `href`.
    pub next_page: String,
    /// Required leading characters of a valid product id; tiles whose id
    /// does not start with this prefix are navigation tiles sharing the
    /// product CSS class and are dropped.
    pub id_prefix: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item_primary: ".category-item-info".to_owned(),
            item_fallback: ".product-item-info".to_owned(),
            link: ".product-item-photo".to_owned(),
            image: ".product-image-photo".to_owned(),
            name: ".product-item-link".to_owned(),
            next_page: ".pages-item-next > .next".to_owned(),
            id_prefix: "7".to_owned(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Base URL of the paginated catalog listing (HTML).
    pub listing_url: String,
    /// Base URL of the batched price-info endpoint (JSON).
    pub price_info_url: String,
    /// Query parameter name repeated once per product id on the
    /// price-info URL.
    pub price_info_param: String,
    pub selectors: SelectorConfig,
    /// Products requested per listing page.
    pub page_size: u32,
    /// Wall-clock budget for one crawl invocation, checked before each
    /// page fetch.
    pub crawl_time_budget_secs: u64,
    /// Fixed delay between successive listing pages (and between
    /// refresh chunks).
    pub inter_page_delay_ms: u64,
    /// Expired-discount records re-priced per price-info call.
    pub refresh_chunk_size: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    /// Cron expression for the recurring crawl job.
    pub crawl_schedule: String,
    /// Cron expression for the recurring expired-discount refresh job.
    pub refresh_schedule: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("listing_url", &self.listing_url)
            .field("price_info_url", &self.price_info_url)
            .field("price_info_param", &self.price_info_param)
            .field("selectors", &self.selectors)
            .field("page_size", &self.page_size)
            .field("crawl_time_budget_secs", &self.crawl_time_budget_secs)
            .field("inter_page_delay_ms", &self.inter_page_delay_ms)
            .field("refresh_chunk_size", &self.refresh_chunk_size)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("crawl_schedule", &self.crawl_schedule)
            .field("refresh_schedule", &self.refresh_schedule)
            .finish()
    }
}
