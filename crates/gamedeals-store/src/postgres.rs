//! Postgres-backed [`GameStore`] built on sqlx.
//!
//! Writes are independent upserts (`ON CONFLICT (id) DO UPDATE` for games,
//! plain inserts for the ledger). The migration creates secondary indexes
//! on the filtered-scan fields so the expired-discount scan and the read
//! API's sort fields stay off sequential scans.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use gamedeals_core::{AppConfig, DiscountRecord, GameRecord};

use crate::{GameStore, StoreError};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/gamedeals-store/Cargo.toml; resolves to
// <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// [`GameStore`] implementation over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GameRow {
    id: String,
    name: String,
    image: Option<String>,
    link: Option<String>,
    current_price: Option<i64>,
    regular_price: Option<i64>,
    discount_rate: Option<i64>,
    discount_start_at: Option<DateTime<Utc>>,
    discount_end_at: Option<DateTime<Utc>>,
    cheapest_price: Option<i64>,
    cheapest_price_end_at: Option<DateTime<Utc>>,
}

impl From<GameRow> for GameRecord {
    fn from(row: GameRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image: row.image,
            link: row.link,
            current_price: row.current_price,
            regular_price: row.regular_price,
            discount_rate: row.discount_rate,
            discount_start_at: row.discount_start_at,
            discount_end_at: row.discount_end_at,
            cheapest_price: row.cheapest_price,
            cheapest_price_end_at: row.cheapest_price_end_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DiscountRecordRow {
    id: Uuid,
    game_id: String,
    regular_price: Option<i64>,
    discount_price: i64,
    discount_rate: Option<i64>,
    discount_start_at: Option<DateTime<Utc>>,
    discount_end_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<DiscountRecordRow> for DiscountRecord {
    fn from(row: DiscountRecordRow) -> Self {
        Self {
            id: row.id,
            game_id: row.game_id,
            regular_price: row.regular_price,
            discount_price: row.discount_price,
            discount_rate: row.discount_rate,
            discount_start_at: row.discount_start_at,
            discount_end_at: row.discount_end_at,
            created_at: row.created_at,
        }
    }
}

const GAME_COLUMNS: &str = "id, name, image, link, current_price, regular_price, \
     discount_rate, discount_start_at, discount_end_at, \
     cheapest_price, cheapest_price_end_at";

#[async_trait]
impl GameStore for PgStore {
    async fn get_game(&self, id: &str) -> Result<Option<GameRecord>, StoreError> {
        let row = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(GameRecord::from))
    }

    async fn put_game(&self, record: &GameRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO games \
                 (id, name, image, link, current_price, regular_price, \
                  discount_rate, discount_start_at, discount_end_at, \
                  cheapest_price, cheapest_price_end_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW()) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 image = EXCLUDED.image, \
                 link = EXCLUDED.link, \
                 current_price = EXCLUDED.current_price, \
                 regular_price = EXCLUDED.regular_price, \
                 discount_rate = EXCLUDED.discount_rate, \
                 discount_start_at = EXCLUDED.discount_start_at, \
                 discount_end_at = EXCLUDED.discount_end_at, \
                 cheapest_price = EXCLUDED.cheapest_price, \
                 cheapest_price_end_at = EXCLUDED.cheapest_price_end_at, \
                 updated_at = NOW()",
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.image)
        .bind(&record.link)
        .bind(record.current_price)
        .bind(record.regular_price)
        .bind(record.discount_rate)
        .bind(record.discount_start_at)
        .bind(record.discount_end_at)
        .bind(record.cheapest_price)
        .bind(record.cheapest_price_end_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_games(&self) -> Result<Vec<GameRecord>, StoreError> {
        let rows =
            sqlx::query_as::<_, GameRow>(&format!("SELECT {GAME_COLUMNS} FROM games"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(GameRecord::from).collect())
    }

    async fn list_games_with_expired_discount(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<GameRecord>, StoreError> {
        let rows = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {GAME_COLUMNS} FROM games \
             WHERE discount_end_at IS NOT NULL AND discount_end_at <= $1"
        ))
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(GameRecord::from).collect())
    }

    async fn insert_discount_record(&self, record: &DiscountRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO game_discount_records \
                 (id, game_id, regular_price, discount_price, discount_rate, \
                  discount_start_at, discount_end_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.id)
        .bind(&record.game_id)
        .bind(record.regular_price)
        .bind(record.discount_price)
        .bind(record.discount_rate)
        .bind(record.discount_start_at)
        .bind(record.discount_end_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_discount_records(
        &self,
        game_id: &str,
    ) -> Result<Vec<DiscountRecord>, StoreError> {
        let rows = sqlx::query_as::<_, DiscountRecordRow>(
            "SELECT id, game_id, regular_price, discount_price, discount_rate, \
                    discount_start_at, discount_end_at, created_at \
             FROM game_discount_records WHERE game_id = $1",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DiscountRecord::from).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }
}
