use anyhow::Result;

use super::trades::render_trade_row;
use super::{format_pnl, load_trades};
use crate::analysis::{dashboard_stats, DashboardStats};
use crate::repository::TradeRepository;

pub fn render_dashboard(stats: &DashboardStats) -> String {
    let mut out = vec![
        format!("Total trades:  {}", stats.total_trades),
        format!(
            "Win rate:      {}%  ({}W / {}L / {}BE, {} pending)",
            stats.win_rate_display(),
            stats.wins,
            stats.losses,
            stats.breakevens,
            stats.open_trades
        ),
        format!("Net P&L:       {}", format_pnl(stats.net_pnl)),
        String::new(),
        "Recent activity".to_string(),
    ];

    if stats.recent.is_empty() {
        out.push("  No trades logged yet.".to_string());
    } else {
        out.extend(stats.recent.iter().map(|t| format!("  {}", render_trade_row(t))));
    }
    out.join("\n")
}

pub async fn run(repo: &mut TradeRepository) -> Result<()> {
    load_trades(repo).await?;
    let stats = dashboard_stats(repo.trades());
    println!("{}", render_dashboard(&stats));
    Ok(())
}
