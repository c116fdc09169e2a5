use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension;

use super::client::{TradeStore, STRATEGIES_TABLE, TRADES_TABLE};
use super::error::StoreError;
use crate::db::Database;
use crate::models::{
    Direction, NewTrade, StrategyDocument, StrategyPayload, Trade, TradeResult, TradeUpdate,
};

const TRADE_COLUMNS: &str = "id, date, time, pair, direction, entry_price, stop_loss, timeframe, \
     target_rr, pnl, setup, strategy, result, comment, chart_url, created_at, user_id";

/// Table store backed by the local SQLite journal database.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn get_trade(&self, id: &str) -> Result<Trade, StoreError> {
        let conn = self.db.conn.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM trades WHERE id = ?", TRADE_COLUMNS),
            [id],
            map_row_to_trade,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            table: TRADES_TABLE,
            id: id.to_string(),
        })
    }

    fn get_strategy(&self, id: &str) -> Result<StrategyDocument, StoreError> {
        let conn = self.db.conn.lock()?;
        conn.query_row(
            "SELECT id, strategy, notes, updated_at FROM strategies WHERE id = ?",
            [id],
            map_row_to_strategy,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound {
            table: STRATEGIES_TABLE,
            id: id.to_string(),
        })
    }
}

/// Helper function to map a database row to a Trade struct
fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    let date: Option<String> = row.get(1)?;
    let direction: Option<String> = row.get(4)?;
    let result: String = row.get(12)?;
    let created_at: Option<String> = row.get(15)?;

    Ok(Trade {
        id: row.get(0)?,
        date: date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        time: row.get(2)?,
        pair: row.get(3)?,
        direction: direction.as_deref().and_then(Direction::parse),
        entry_price: row.get(5)?,
        stop_loss: row.get(6)?,
        timeframe: row.get(7)?,
        target_rr: row.get(8)?,
        pnl: row.get(9)?,
        setup: row.get(10)?,
        strategy: row.get(11)?,
        result: TradeResult::parse(&result).unwrap_or(TradeResult::Unknown),
        comment: row.get(13)?,
        chart_url: row.get(14)?,
        created_at: created_at.as_deref().and_then(parse_timestamp),
        user_id: row.get(16)?,
    })
}

fn map_row_to_strategy(row: &rusqlite::Row) -> rusqlite::Result<StrategyDocument> {
    let updated_at: Option<String> = row.get(3)?;
    Ok(StrategyDocument {
        id: row.get(0)?,
        strategy: row.get(1)?,
        notes: row.get(2)?,
        updated_at: updated_at.as_deref().and_then(parse_timestamp),
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[async_trait]
impl TradeStore for SqliteStore {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn select_trades(&self) -> Result<Vec<Trade>, StoreError> {
        let conn = self.db.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM trades ORDER BY date DESC, created_at DESC",
            TRADE_COLUMNS
        ))?;
        let trades = stmt
            .query_map([], map_row_to_trade)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trades)
    }

    async fn insert_trade(&self, trade: NewTrade) -> Result<Trade, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        {
            let conn = self.db.conn.lock()?;
            conn.execute(
                &format!(
                    "INSERT INTO trades ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    TRADE_COLUMNS
                ),
                rusqlite::params![
                    id,
                    format_date(trade.date),
                    trade.time,
                    trade.pair,
                    trade.direction.as_str(),
                    trade.entry_price,
                    trade.stop_loss,
                    trade.timeframe,
                    trade.target_rr,
                    trade.pnl,
                    trade.setup,
                    trade.strategy,
                    trade.result.as_str(),
                    trade.comment,
                    trade.chart_url,
                    Utc::now().to_rfc3339(),
                    trade.user_id,
                ],
            )?;
        }

        self.get_trade(&id)
    }

    async fn update_trade(&self, id: &str, fields: TradeUpdate) -> Result<Trade, StoreError> {
        {
            let conn = self.db.conn.lock()?;

            let mut updates: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(date) = fields.date {
                updates.push("date = ?");
                values.push(Box::new(format_date(date)));
            }
            if let Some(time) = fields.time {
                updates.push("time = ?");
                values.push(Box::new(time));
            }
            if let Some(pair) = fields.pair {
                updates.push("pair = ?");
                values.push(Box::new(pair));
            }
            if let Some(direction) = fields.direction {
                updates.push("direction = ?");
                values.push(Box::new(direction.as_str()));
            }
            if let Some(entry_price) = fields.entry_price {
                updates.push("entry_price = ?");
                values.push(Box::new(entry_price));
            }
            if let Some(stop_loss) = fields.stop_loss {
                updates.push("stop_loss = ?");
                values.push(Box::new(stop_loss));
            }
            if let Some(timeframe) = fields.timeframe {
                updates.push("timeframe = ?");
                values.push(Box::new(timeframe));
            }
            if let Some(target_rr) = fields.target_rr {
                updates.push("target_rr = ?");
                values.push(Box::new(target_rr));
            }
            if let Some(pnl) = fields.pnl {
                updates.push("pnl = ?");
                values.push(Box::new(pnl));
            }
            if let Some(setup) = fields.setup {
                updates.push("setup = ?");
                values.push(Box::new(setup));
            }
            if let Some(strategy) = fields.strategy {
                updates.push("strategy = ?");
                values.push(Box::new(strategy));
            }
            if let Some(result) = fields.result {
                updates.push("result = ?");
                values.push(Box::new(result.as_str()));
            }
            if let Some(comment) = fields.comment {
                updates.push("comment = ?");
                values.push(Box::new(comment));
            }
            if let Some(chart_url) = fields.chart_url {
                updates.push("chart_url = ?");
                values.push(Box::new(chart_url));
            }

            // An empty update still has to prove the row exists.
            if !updates.is_empty() {
                let query = format!("UPDATE trades SET {} WHERE id = ?", updates.join(", "));
                values.push(Box::new(id.to_string()));

                let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
                let changed = conn.execute(&query, params.as_slice())?;
                if changed == 0 {
                    return Err(StoreError::NotFound {
                        table: TRADES_TABLE,
                        id: id.to_string(),
                    });
                }
            }
        }

        self.get_trade(id)
    }

    async fn delete_trade(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.db.conn.lock()?;
        let removed = conn.execute("DELETE FROM trades WHERE id = ?", [id])?;
        log::debug!("Deleted {} trade row(s) for id {}", removed, id);
        Ok(())
    }

    async fn fetch_strategy(&self) -> Result<Option<StrategyDocument>, StoreError> {
        let conn = self.db.conn.lock()?;
        let doc = conn
            .query_row(
                "SELECT id, strategy, notes, updated_at FROM strategies LIMIT 1",
                [],
                map_row_to_strategy,
            )
            .optional()?;
        Ok(doc)
    }

    async fn insert_strategy(
        &self,
        payload: StrategyPayload,
    ) -> Result<StrategyDocument, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        {
            let conn = self.db.conn.lock()?;
            conn.execute(
                "INSERT INTO strategies (id, strategy, notes, updated_at) VALUES (?, ?, ?, ?)",
                rusqlite::params![
                    id,
                    payload.strategy,
                    payload.notes,
                    payload.updated_at.to_rfc3339()
                ],
            )?;
        }

        self.get_strategy(&id)
    }

    async fn update_strategy(
        &self,
        id: &str,
        payload: StrategyPayload,
    ) -> Result<StrategyDocument, StoreError> {
        {
            let conn = self.db.conn.lock()?;
            let changed = conn.execute(
                "UPDATE strategies SET strategy = ?, notes = ?, updated_at = ? WHERE id = ?",
                rusqlite::params![
                    payload.strategy,
                    payload.notes,
                    payload.updated_at.to_rfc3339(),
                    id
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound {
                    table: STRATEGIES_TABLE,
                    id: id.to_string(),
                });
            }
        }

        self.get_strategy(id)
    }
}
