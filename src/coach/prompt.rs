use crate::models::Trade;

/// Trades, most recent first, that go into one coaching request.
pub const RECENT_TRADE_WINDOW: usize = 30;

/// One line per trade: result, pair, strategy, P&L, comment and setup.
pub fn format_trade_line(trade: &Trade) -> String {
    let pnl = trade.pnl.map(|v| v.to_string()).unwrap_or_default();
    format!(
        "- Result: {}, Pair: {}, Strategy: {}, PnL: {}, Comment: \"{}\", Setup: \"{}\"",
        trade.result, trade.pair, trade.strategy, pnl, trade.comment, trade.setup
    )
}

/// Builds the coaching prompt from the first [`RECENT_TRADE_WINDOW`] trades
/// of `trades`, which are expected newest first.
pub fn build_prompt(trades: &[Trade]) -> String {
    let logs = trades
        .iter()
        .take(RECENT_TRADE_WINDOW)
        .map(format_trade_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a professional trading coach. Analyze these recent trade logs from a trader's journal.\n\
         Identify patterns in their behavior, winning conditions, and losing conditions.\n\
         Pay special attention to their comments and mental state if mentioned.\n\
         \n\
         Trade Logs:\n\
         {}\n\
         \n\
         Provide 3 concise, actionable insights to help them improve.\n\
         Format as a simple bulleted list in Markdown.",
        logs
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trade(id: usize) -> Trade {
        serde_json::from_value(json!({
            "id": id.to_string(),
            "pair": format!("PAIR{}", id),
            "strategy": "Breakout",
            "result": "Lose",
            "pnl": -20,
            "comment": "chased entry",
            "setup": "retest of range high"
        }))
        .unwrap()
    }

    #[test]
    fn test_trade_line_format() {
        assert_eq!(
            format_trade_line(&trade(1)),
            "- Result: Lose, Pair: PAIR1, Strategy: Breakout, PnL: -20, Comment: \"chased entry\", Setup: \"retest of range high\""
        );
    }

    #[test]
    fn test_missing_pnl_renders_empty() {
        let t: Trade = serde_json::from_value(json!({ "id": "x", "result": "Pending" })).unwrap();
        assert!(format_trade_line(&t).contains("PnL: , Comment: \"\""));
    }

    #[test]
    fn test_prompt_uses_thirty_most_recent() {
        let trades: Vec<Trade> = (0..40).map(trade).collect();
        let prompt = build_prompt(&trades);

        assert_eq!(prompt.matches("- Result:").count(), RECENT_TRADE_WINDOW);
        assert!(prompt.contains("Pair: PAIR0,"));
        assert!(prompt.contains("Pair: PAIR29,"));
        assert!(!prompt.contains("Pair: PAIR30,"));
        assert!(prompt.contains("Provide 3 concise, actionable insights"));
    }
}
