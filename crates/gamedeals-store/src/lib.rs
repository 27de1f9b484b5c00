//! Storage collaborator for game records and the discount-record ledger.
//!
//! The crawl pipeline only depends on the [`GameStore`] trait, so the merge
//! path can be exercised against [`MemoryStore`] in tests while production
//! runs against Postgres ([`PgStore`]). Each write is an independent upsert;
//! there are no cross-record transactions, and readers may observe a
//! partially-updated crawl pass.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use gamedeals_core::{DiscountRecord, GameRecord};

pub use memory::MemoryStore;
pub use postgres::{connect_pool, run_migrations, PgStore, PoolConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// The two logical collections behind the price tracker: current-state game
/// records keyed by product id, and the append-only discount ledger.
///
/// Implementations must index the fields used by filtered scans (discount
/// window bounds, discount rate, name; ledger game id + window start).
/// That is a storage concern, not a merge-engine one.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get_game(&self, id: &str) -> Result<Option<GameRecord>, StoreError>;

    /// Creates or fully replaces the record for `record.id`.
    async fn put_game(&self, record: &GameRecord) -> Result<(), StoreError>;

    async fn list_games(&self) -> Result<Vec<GameRecord>, StoreError>;

    /// Games whose discount window has already ended as of `as_of`.
    async fn list_games_with_expired_discount(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<GameRecord>, StoreError>;

    /// Appends one ledger entry. Ledger rows are never updated or deleted.
    async fn insert_discount_record(&self, record: &DiscountRecord) -> Result<(), StoreError>;

    async fn list_discount_records(&self, game_id: &str)
        -> Result<Vec<DiscountRecord>, StoreError>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
