use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Args;

use super::{format_pnl, load_trades};
use crate::models::{Direction, NewTrade, Trade, TradeResult, TradeUpdate};
use crate::repository::TradeRepository;

fn parse_direction(raw: &str) -> Result<Direction, String> {
    Direction::parse(raw).ok_or_else(|| format!("expected Long or Short, got '{}'", raw))
}

fn parse_result(raw: &str) -> Result<TradeResult, String> {
    TradeResult::parse(raw)
        .ok_or_else(|| format!("expected Win, Lose, BE or Pending, got '{}'", raw))
}

/// Trade form fields. On `add` missing fields take the form defaults, on
/// `edit` only the given fields are sent.
///
/// Prices, target RR and P&L are parsed as numbers here, so non-numeric text
/// is rejected by the argument parser instead of being stored. Rows that
/// already hold such text are still read leniently.
#[derive(Args, Debug, Clone, Default)]
pub struct TradeFields {
    /// Trade date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Entry time (HH:MM)
    #[arg(long)]
    pub time: Option<String>,
    #[arg(long)]
    pub pair: Option<String>,
    /// Long or Short
    #[arg(long, value_parser = parse_direction)]
    pub direction: Option<Direction>,
    #[arg(long = "entry", allow_negative_numbers = true)]
    pub entry_price: Option<f64>,
    #[arg(long = "stop", allow_negative_numbers = true)]
    pub stop_loss: Option<f64>,
    #[arg(long)]
    pub timeframe: Option<String>,
    /// Target risk/reward
    #[arg(long = "rr", allow_negative_numbers = true)]
    pub target_rr: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub pnl: Option<f64>,
    #[arg(long)]
    pub setup: Option<String>,
    #[arg(long)]
    pub strategy: Option<String>,
    /// Win, Lose, BE or Pending
    #[arg(long, value_parser = parse_result)]
    pub result: Option<TradeResult>,
    #[arg(long)]
    pub comment: Option<String>,
    #[arg(long)]
    pub chart_url: Option<String>,
}

impl TradeFields {
    pub fn into_new_trade(self) -> NewTrade {
        let defaults = NewTrade::default();
        NewTrade {
            date: self.date.unwrap_or(defaults.date),
            time: self.time.unwrap_or(defaults.time),
            pair: self.pair.unwrap_or_default(),
            direction: self.direction.unwrap_or(defaults.direction),
            entry_price: self.entry_price,
            stop_loss: self.stop_loss,
            timeframe: self.timeframe.unwrap_or_default(),
            target_rr: self.target_rr,
            pnl: self.pnl,
            setup: self.setup.unwrap_or_default(),
            strategy: self.strategy.unwrap_or_default(),
            result: self.result.unwrap_or(defaults.result),
            comment: self.comment.unwrap_or_default(),
            chart_url: self.chart_url.filter(|url| !url.is_empty()),
            user_id: None,
        }
    }

    pub fn into_update(self) -> TradeUpdate {
        TradeUpdate {
            date: self.date,
            time: self.time,
            pair: self.pair,
            direction: self.direction,
            entry_price: self.entry_price,
            stop_loss: self.stop_loss,
            timeframe: self.timeframe,
            target_rr: self.target_rr,
            pnl: self.pnl,
            setup: self.setup,
            strategy: self.strategy,
            result: self.result,
            comment: self.comment,
            chart_url: self.chart_url,
        }
    }
}

fn display_date(trade: &Trade) -> String {
    trade
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string())
}

fn display_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn render_trade_row(trade: &Trade) -> String {
    format!(
        "{:<8} {} {:<5} {:<12} {:<5} {:<7} {:>10}",
        trade.id,
        display_date(trade),
        trade.time.as_deref().unwrap_or(""),
        trade.pair,
        trade.direction.map(|d| d.as_str()).unwrap_or("-"),
        trade.result,
        format_pnl(trade.pnl_value()),
    )
}

pub fn render_trade_list(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return "No trades found. Start by adding one!".to_string();
    }
    trades
        .iter()
        .map(render_trade_row)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_trade_detail(trade: &Trade) -> String {
    let mut lines = vec![
        format!("Trade {}", trade.id),
        format!("  Date:       {} {}", display_date(trade), trade.time.as_deref().unwrap_or("")),
        format!("  Pair:       {}", trade.pair),
        format!(
            "  Direction:  {}",
            trade.direction.map(|d| d.as_str()).unwrap_or("-")
        ),
        format!("  Timeframe:  {}", trade.timeframe),
        format!("  Entry:      {}", display_number(trade.entry_price)),
        format!("  Stop loss:  {}", display_number(trade.stop_loss)),
        format!("  Target RR:  {}", display_number(trade.target_rr)),
        format!("  Result:     {}", trade.result),
        format!("  P&L:        {}", format_pnl(trade.pnl_value())),
        format!("  Setup:      {}", trade.setup),
        format!("  Strategy:   {}", trade.strategy),
        format!("  Comment:    {}", trade.comment),
    ];
    if let Some(url) = &trade.chart_url {
        lines.push(format!("  Chart:      {}", url));
    }
    lines.join("\n")
}

pub async fn list(repo: &mut TradeRepository) -> Result<()> {
    load_trades(repo).await?;
    println!("{}", render_trade_list(repo.trades()));
    Ok(())
}

pub async fn show(repo: &mut TradeRepository, id: &str) -> Result<()> {
    load_trades(repo).await?;
    match repo.get(id) {
        Some(trade) => println!("{}", render_trade_detail(trade)),
        None => println!("Trade not found"),
    }
    Ok(())
}

pub async fn add(repo: &mut TradeRepository, fields: TradeFields) -> Result<()> {
    let stored = repo.add(fields.into_new_trade()).await?;
    log::info!("Trade {} logged", stored.id);
    println!("{}", render_trade_row(&stored));
    Ok(())
}

pub async fn edit(repo: &mut TradeRepository, id: &str, fields: TradeFields) -> Result<()> {
    let update = fields.into_update();
    if update.is_empty() {
        bail!("Nothing to update: pass at least one field");
    }
    let stored = repo.update(id, update).await?;
    println!("{}", render_trade_row(&stored));
    Ok(())
}

pub async fn delete(repo: &mut TradeRepository, id: &str) -> Result<()> {
    repo.delete(id).await?;
    println!("Deleted trade {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn trade(value: serde_json::Value) -> Trade {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_add_uses_form_defaults() {
        let fields = TradeFields {
            pair: Some("EUR/USD".to_string()),
            pnl: Some(-12.5),
            ..Default::default()
        };
        let new_trade = fields.into_new_trade();

        assert_eq!(new_trade.pair, "EUR/USD");
        assert_eq!(new_trade.direction, Direction::Long);
        assert_eq!(new_trade.result, TradeResult::Win);
        assert_eq!(new_trade.time.len(), 5);
        assert_eq!(new_trade.pnl, Some(-12.5));
    }

    #[test]
    fn test_edit_sends_only_given_fields() {
        let fields = TradeFields {
            result: Some(TradeResult::Lose),
            ..Default::default()
        };
        let update = fields.into_update();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "result": "Lose" })
        );
        assert!(TradeFields::default().into_update().is_empty());
    }

    #[derive(clap::Parser)]
    struct Form {
        #[command(flatten)]
        fields: TradeFields,
    }

    #[test]
    fn test_numeric_fields_are_parsed_at_the_command_line() {
        use clap::Parser;

        let form = Form::try_parse_from(["add", "--pnl", "-40.5", "--rr", "2"]).unwrap();
        assert_eq!(form.fields.pnl, Some(-40.5));
        assert_eq!(form.fields.target_rr, Some(2.0));

        assert!(Form::try_parse_from(["add", "--pnl", "lots"]).is_err());
        assert!(Form::try_parse_from(["add", "--entry", ""]).is_err());
    }

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_direction("short"), Ok(Direction::Short));
        assert!(parse_direction("sideways").is_err());
        assert_eq!(parse_result("BE"), Ok(TradeResult::BreakEven));
        assert!(parse_result("maybe").is_err());
    }

    #[test]
    fn test_render_rows_and_detail() {
        let t = trade(serde_json::json!({
            "id": 7, "date": "2024-03-01", "time": "09:15", "pair": "BTC/USD",
            "direction": "Long", "result": "Win", "pnl": "120", "comment": "clean break"
        }));

        let row = render_trade_row(&t);
        assert!(row.starts_with("7 "));
        assert!(row.contains("2024-03-01"));
        assert!(row.contains("+120.00"));

        let detail = render_trade_detail(&t);
        assert!(detail.contains("Comment:    clean break"));
        assert!(detail.contains("Stop loss:  -"));
        assert!(!detail.contains("Chart:"));

        assert_eq!(render_trade_list(&[]), "No trades found. Start by adding one!");
    }

    #[tokio::test]
    async fn test_edit_without_fields_is_rejected_before_store_call() {
        let store = Arc::new(MemoryStore::new());
        let mut repo = TradeRepository::new(store.clone());

        assert!(edit(&mut repo, "1", TradeFields::default()).await.is_err());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_delete_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let mut repo = TradeRepository::new(store.clone());

        add(&mut repo, TradeFields::default()).await.unwrap();
        let id = repo.trades()[0].id.clone();
        delete(&mut repo, &id).await.unwrap();

        assert!(repo.trades().is_empty());
        assert_eq!(store.calls(), vec!["insert_trade", "delete_trade"]);
    }
}
