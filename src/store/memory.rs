use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::client::{TradeStore, STRATEGIES_TABLE, TRADES_TABLE};
use super::error::StoreError;
use crate::models::{NewTrade, StrategyDocument, StrategyPayload, Trade, TradeUpdate};

#[derive(Default)]
struct MemoryState {
    trades: Vec<Trade>,
    strategy: Option<StrategyDocument>,
    next_id: u64,
    fail_next: Option<String>,
    calls: Vec<String>,
}

/// In-process table store. Ids are sequential (`1`, `2`, ...) and the next
/// call can be made to fail with [`MemoryStore::fail_next`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds rows as if they were already stored.
    pub fn with_trades(trades: Vec<Trade>) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.next_id = trades.len() as u64;
            state.trades = trades;
        }
        store
    }

    /// Makes the next store call fail with a backend error carrying `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = Some(message.into());
        }
    }

    /// Names of the operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    pub fn strategy_writes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.as_str() == "insert_strategy" || c.as_str() == "update_strategy")
            .count()
    }

    fn begin(&self, op: &str) -> Result<std::sync::MutexGuard<'_, MemoryState>, StoreError> {
        let mut state = self.state.lock()?;
        state.calls.push(op.to_string());
        if let Some(message) = state.fail_next.take() {
            return Err(StoreError::BackendError {
                code: "memory".to_string(),
                message,
            });
        }
        Ok(state)
    }
}

impl MemoryState {
    fn assign_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn select_trades(&self) -> Result<Vec<Trade>, StoreError> {
        let state = self.begin("select_trades")?;
        let mut trades = state.trades.clone();
        // stable, so equal dates keep insertion order
        trades.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(trades)
    }

    async fn insert_trade(&self, trade: NewTrade) -> Result<Trade, StoreError> {
        let mut state = self.begin("insert_trade")?;
        let stored = Trade {
            id: state.assign_id(),
            date: Some(trade.date),
            time: Some(trade.time),
            pair: trade.pair,
            direction: Some(trade.direction),
            entry_price: trade.entry_price,
            stop_loss: trade.stop_loss,
            timeframe: trade.timeframe,
            target_rr: trade.target_rr,
            pnl: trade.pnl,
            setup: trade.setup,
            strategy: trade.strategy,
            result: trade.result,
            comment: trade.comment,
            chart_url: trade.chart_url,
            created_at: Some(Utc::now()),
            user_id: trade.user_id,
        };
        state.trades.push(stored.clone());
        Ok(stored)
    }

    async fn update_trade(&self, id: &str, fields: TradeUpdate) -> Result<Trade, StoreError> {
        let mut state = self.begin("update_trade")?;
        let trade = state
            .trades
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound {
                table: TRADES_TABLE,
                id: id.to_string(),
            })?;
        fields.apply_to(trade);
        Ok(trade.clone())
    }

    async fn delete_trade(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.begin("delete_trade")?;
        state.trades.retain(|t| t.id != id);
        Ok(())
    }

    async fn fetch_strategy(&self) -> Result<Option<StrategyDocument>, StoreError> {
        let state = self.begin("fetch_strategy")?;
        Ok(state.strategy.clone())
    }

    async fn insert_strategy(
        &self,
        payload: StrategyPayload,
    ) -> Result<StrategyDocument, StoreError> {
        let mut state = self.begin("insert_strategy")?;
        let doc = StrategyDocument {
            id: state.assign_id(),
            strategy: Some(payload.strategy),
            notes: Some(payload.notes),
            updated_at: Some(payload.updated_at),
        };
        state.strategy = Some(doc.clone());
        Ok(doc)
    }

    async fn update_strategy(
        &self,
        id: &str,
        payload: StrategyPayload,
    ) -> Result<StrategyDocument, StoreError> {
        let mut state = self.begin("update_strategy")?;
        match state.strategy.as_mut() {
            Some(doc) if doc.id == id => {
                doc.strategy = Some(payload.strategy);
                doc.notes = Some(payload.notes);
                doc.updated_at = Some(payload.updated_at);
                Ok(doc.clone())
            }
            _ => Err(StoreError::NotFound {
                table: STRATEGIES_TABLE,
                id: id.to_string(),
            }),
        }
    }
}
