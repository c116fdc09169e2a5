use async_trait::async_trait;

use super::error::StoreError;
use crate::models::{NewTrade, StrategyDocument, StrategyPayload, Trade, TradeUpdate};

pub const TRADES_TABLE: &str = "trades";
pub const STRATEGIES_TABLE: &str = "strategies";

/// Table store holding the `trades` rows and the singleton `strategies` row.
///
/// Implementations assign ids and creation timestamps; callers treat the
/// returned records as canonical.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Backend name for logs (e.g., "sqlite", "rest")
    fn backend_name(&self) -> &str;

    /// All trades, ordered by `date` descending
    async fn select_trades(&self) -> Result<Vec<Trade>, StoreError>;

    /// Insert one trade and return the stored row
    async fn insert_trade(&self, trade: NewTrade) -> Result<Trade, StoreError>;

    /// Update the trade matching `id` and return the stored row
    async fn update_trade(&self, id: &str, fields: TradeUpdate) -> Result<Trade, StoreError>;

    /// Delete by id equality. Deleting an id with no row is not an error.
    async fn delete_trade(&self, id: &str) -> Result<(), StoreError>;

    /// First strategy row, if any
    async fn fetch_strategy(&self) -> Result<Option<StrategyDocument>, StoreError>;

    async fn insert_strategy(
        &self,
        payload: StrategyPayload,
    ) -> Result<StrategyDocument, StoreError>;

    async fn update_strategy(
        &self,
        id: &str,
        payload: StrategyPayload,
    ) -> Result<StrategyDocument, StoreError>;
}
