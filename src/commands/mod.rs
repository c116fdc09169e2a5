pub mod patterns;
pub mod stats;
pub mod strategy;
pub mod trades;

use anyhow::{anyhow, Result};

use crate::repository::TradeRepository;

/// Fetches the trade list, surfacing a failed fetch as an error.
pub async fn load_trades(repo: &mut TradeRepository) -> Result<()> {
    repo.fetch().await;
    match repo.error() {
        Some(err) => Err(anyhow!("Error fetching trades: {}", err)),
        None => Ok(()),
    }
}

pub(crate) fn format_pnl(value: f64) -> String {
    if value > 0.0 {
        format!("+{:.2}", value)
    } else {
        format!("{:.2}", value)
    }
}
