//! In-memory [`GameStore`] used by unit and integration tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gamedeals_core::{DiscountRecord, GameRecord};

use crate::{GameStore, StoreError};

/// HashMap-backed store. Locks are never held across an await point.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: RwLock<HashMap<String, GameRecord>>,
    discount_records: RwLock<Vec<DiscountRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of ledger entries across all games.
    ///
    /// # Panics
    ///
    /// Panics if the inner lock is poisoned.
    #[must_use]
    pub fn discount_record_count(&self) -> usize {
        self.discount_records.read().expect("lock poisoned").len()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn get_game(&self, id: &str) -> Result<Option<GameRecord>, StoreError> {
        let games = self.games.read().expect("lock poisoned");
        Ok(games.get(id).cloned())
    }

    async fn put_game(&self, record: &GameRecord) -> Result<(), StoreError> {
        let mut games = self.games.write().expect("lock poisoned");
        games.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list_games(&self) -> Result<Vec<GameRecord>, StoreError> {
        let games = self.games.read().expect("lock poisoned");
        Ok(games.values().cloned().collect())
    }

    async fn list_games_with_expired_discount(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<GameRecord>, StoreError> {
        let games = self.games.read().expect("lock poisoned");
        Ok(games
            .values()
            .filter(|g| g.discount_end_at.is_some_and(|end| end <= as_of))
            .cloned()
            .collect())
    }

    async fn insert_discount_record(&self, record: &DiscountRecord) -> Result<(), StoreError> {
        let mut records = self.discount_records.write().expect("lock poisoned");
        records.push(record.clone());
        Ok(())
    }

    async fn list_discount_records(
        &self,
        game_id: &str,
    ) -> Result<Vec<DiscountRecord>, StoreError> {
        let records = self.discount_records.read().expect("lock poisoned");
        Ok(records
            .iter()
            .filter(|r| r.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn game(id: &str, discount_end_at: Option<DateTime<Utc>>) -> GameRecord {
        GameRecord {
            id: id.to_owned(),
            name: format!("Game {id}"),
            image: None,
            link: None,
            current_price: Some(100),
            regular_price: Some(100),
            discount_rate: None,
            discount_start_at: None,
            discount_end_at,
            cheapest_price: Some(100),
            cheapest_price_end_at: None,
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        let record = game("70000001", None);
        store.put_game(&record).await.unwrap();
        assert_eq!(store.get_game("70000001").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get_game("70000009").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_replaces_existing_record() {
        let store = MemoryStore::new();
        store.put_game(&game("70000001", None)).await.unwrap();
        let mut updated = game("70000001", None);
        updated.current_price = Some(50);
        store.put_game(&updated).await.unwrap();
        let fetched = store.get_game("70000001").await.unwrap().unwrap();
        assert_eq!(fetched.current_price, Some(50));
        assert_eq!(store.list_games().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn expired_discount_scan_filters_by_end_date() {
        let store = MemoryStore::new();
        store
            .put_game(&game("70000001", Some(at(2024, 1, 8))))
            .await
            .unwrap();
        store
            .put_game(&game("70000002", Some(at(2024, 3, 1))))
            .await
            .unwrap();
        store.put_game(&game("70000003", None)).await.unwrap();

        let expired = store
            .list_games_with_expired_discount(at(2024, 2, 1))
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "70000001");
    }

    #[tokio::test]
    async fn discount_records_filtered_by_game_id() {
        let store = MemoryStore::new();
        for game_id in ["70000001", "70000001", "70000002"] {
            store
                .insert_discount_record(&DiscountRecord {
                    id: Uuid::new_v4(),
                    game_id: game_id.to_owned(),
                    regular_price: Some(200),
                    discount_price: 150,
                    discount_rate: Some(25),
                    discount_start_at: None,
                    discount_end_at: None,
                    created_at: at(2024, 1, 1),
                })
                .await
                .unwrap();
        }
        let records = store.list_discount_records("70000001").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.game_id == "70000001"));
    }
}
