use serde::{Deserialize, Serialize};

use crate::models::{Trade, TradeResult};

pub const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    pub open_trades: usize,
    /// Wins over every logged trade, pending ones included.
    pub win_rate: f64,
    pub net_pnl: f64,
    pub recent: Vec<Trade>,
}

impl DashboardStats {
    /// Win rate with one decimal, as shown on the dashboard card.
    pub fn win_rate_display(&self) -> String {
        format!("{:.1}", self.win_rate)
    }
}

pub fn dashboard_stats(trades: &[Trade]) -> DashboardStats {
    let count = |result: TradeResult| trades.iter().filter(|t| t.result == result).count();

    let total_trades = trades.len();
    let wins = count(TradeResult::Win);
    let losses = count(TradeResult::Lose);

    let win_rate = if total_trades > 0 {
        (wins as f64 / total_trades as f64) * 100.0
    } else {
        0.0
    };

    DashboardStats {
        total_trades,
        wins,
        losses,
        breakevens: count(TradeResult::BreakEven),
        open_trades: count(TradeResult::Pending),
        win_rate,
        net_pnl: trades.iter().map(Trade::pnl_value).sum(),
        recent: trades.iter().take(RECENT_ACTIVITY_LIMIT).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trade(id: u32, result: &str, pnl: serde_json::Value) -> Trade {
        serde_json::from_value(json!({ "id": id, "result": result, "pnl": pnl })).unwrap()
    }

    #[test]
    fn test_empty_journal() {
        let stats = dashboard_stats(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.net_pnl, 0.0);
        assert!(stats.recent.is_empty());
    }

    #[test]
    fn test_pending_counts_toward_win_rate_denominator() {
        let trades = vec![
            trade(1, "Win", json!(100)),
            trade(2, "Lose", json!(-50)),
            trade(3, "Pending", json!(null)),
            trade(4, "Win", json!("25.5")),
        ];
        let stats = dashboard_stats(&trades);

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.open_trades, 1);
        assert_eq!(stats.win_rate_display(), "50.0");
        assert!((stats.net_pnl - 75.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_numeric_pnl_counts_as_zero() {
        let trades = vec![trade(1, "Win", json!("n/a")), trade(2, "Win", json!(10))];
        assert_eq!(dashboard_stats(&trades).net_pnl, 10.0);
    }

    #[test]
    fn test_recent_takes_first_five() {
        let trades: Vec<Trade> = (1..=7).map(|i| trade(i, "BE", json!(0))).collect();
        let stats = dashboard_stats(&trades);
        let ids: Vec<&str> = stats.recent.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(stats.breakevens, 7);
    }
}
