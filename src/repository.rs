use std::sync::Arc;

use crate::models::{NewTrade, Trade, TradeUpdate};
use crate::store::{StoreError, TradeStore};

/// Owns the in-memory trade list and keeps it in line with the store's
/// responses.
///
/// The list is a cache of the last fetch plus the mutations made through
/// this repository:
/// - `fetch` replaces it with the store's date-descending order.
/// - `add` prepends the stored record without re-sorting, so an older trade
///   sits at the front until the next `fetch`.
/// - `update` swaps the matching record in place.
/// - `delete` drops the matching record, if present.
///
/// A failed call leaves the list untouched.
pub struct TradeRepository {
    store: Arc<dyn TradeStore>,
    trades: Vec<Trade>,
    loading: bool,
    error: Option<String>,
}

impl TradeRepository {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self {
            store,
            trades: Vec::new(),
            loading: false,
            error: None,
        }
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn get(&self, id: &str) -> Option<&Trade> {
        self.trades.iter().find(|t| t.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed `fetch`, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn fetch(&mut self) {
        self.loading = true;
        match self.store.select_trades().await {
            Ok(trades) => {
                log::info!(
                    "Fetched {} trades from {} store",
                    trades.len(),
                    self.store.backend_name()
                );
                self.trades = trades;
            }
            Err(e) => {
                log::error!("Error fetching trades: {}", e);
                self.error = Some(e.to_string());
            }
        }
        self.loading = false;
    }

    pub async fn add(&mut self, trade: NewTrade) -> Result<Trade, StoreError> {
        match self.store.insert_trade(trade).await {
            Ok(stored) => {
                self.trades.insert(0, stored.clone());
                Ok(stored)
            }
            Err(e) => {
                log::error!("Error adding trade: {}", e);
                Err(e)
            }
        }
    }

    pub async fn update(&mut self, id: &str, fields: TradeUpdate) -> Result<Trade, StoreError> {
        match self.store.update_trade(id, fields).await {
            Ok(stored) => {
                if let Some(slot) = self.trades.iter_mut().find(|t| t.id == id) {
                    *slot = stored.clone();
                }
                Ok(stored)
            }
            Err(e) => {
                log::error!("Error updating trade {}: {}", id, e);
                Err(e)
            }
        }
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        match self.store.delete_trade(id).await {
            Ok(()) => {
                self.trades.retain(|t| t.id != id);
                Ok(())
            }
            Err(e) => {
                log::error!("Error deleting trade {}: {}", id, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeResult;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn new_trade(d: u32, pair: &str) -> NewTrade {
        NewTrade {
            date: day(d),
            time: "09:00".to_string(),
            pair: pair.to_string(),
            result: TradeResult::Win,
            pnl: Some(10.0),
            ..Default::default()
        }
    }

    async fn seeded() -> (Arc<MemoryStore>, TradeRepository) {
        let store = Arc::new(MemoryStore::new());
        let mut repo = TradeRepository::new(store.clone());
        repo.add(new_trade(10, "A")).await.unwrap();
        repo.add(new_trade(20, "B")).await.unwrap();
        repo.fetch().await;
        (store, repo)
    }

    fn pairs(repo: &TradeRepository) -> Vec<&str> {
        repo.trades().iter().map(|t| t.pair.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fetch_orders_by_date_descending() {
        let (_, repo) = seeded().await;
        assert_eq!(pairs(&repo), vec!["B", "A"]);
        assert!(repo.error().is_none());
        assert!(!repo.is_loading());
    }

    #[tokio::test]
    async fn test_add_prepends_without_resorting_until_fetch() {
        let (_, mut repo) = seeded().await;

        let stored = repo.add(new_trade(1, "OLD")).await.unwrap();
        assert!(!stored.id.is_empty());
        assert!(stored.created_at.is_some());
        assert_eq!(pairs(&repo), vec!["OLD", "B", "A"]);

        repo.fetch().await;
        assert_eq!(pairs(&repo), vec!["B", "A", "OLD"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_list_and_sets_error() {
        let (store, mut repo) = seeded().await;
        store.fail_next("connection reset");

        repo.fetch().await;

        assert_eq!(pairs(&repo), vec!["B", "A"]);
        assert!(repo.error().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_add_failure_leaves_list_unchanged() {
        let (store, mut repo) = seeded().await;
        store.fail_next("insert rejected");

        let result = repo.add(new_trade(25, "C")).await;

        assert!(result.is_err());
        assert_eq!(pairs(&repo), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let (_, mut repo) = seeded().await;
        let id = repo.trades()[1].id.clone();

        let updated = repo
            .update(
                &id,
                TradeUpdate {
                    pair: Some("A2".to_string()),
                    result: Some(TradeResult::Lose),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.result, TradeResult::Lose);
        assert_eq!(pairs(&repo), vec!["B", "A2"]);
        assert_eq!(repo.get(&id).unwrap().result, TradeResult::Lose);
    }

    #[tokio::test]
    async fn test_update_failure_leaves_list_unchanged() {
        let (store, mut repo) = seeded().await;
        let id = repo.trades()[0].id.clone();
        store.fail_next("timeout");

        let result = repo
            .update(
                &id,
                TradeUpdate {
                    pnl: Some(-5.0),
                    ..Default::default()
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(repo.get(&id).unwrap().pnl, Some(10.0));
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let (_, mut repo) = seeded().await;
        let id = repo.trades()[0].id.clone();

        repo.delete(&id).await.unwrap();

        assert_eq!(pairs(&repo), vec!["A"]);
        assert!(repo.get(&id).is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_still_calls_store() {
        let (store, mut repo) = seeded().await;

        repo.delete("not-there").await.unwrap();

        assert_eq!(store.calls().last().map(String::as_str), Some("delete_trade"));
        assert_eq!(pairs(&repo), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_delete_failure_leaves_list_unchanged() {
        let (store, mut repo) = seeded().await;
        let id = repo.trades()[0].id.clone();
        store.fail_next("permission denied");

        assert!(repo.delete(&id).await.is_err());
        assert_eq!(pairs(&repo), vec!["B", "A"]);
    }
}
