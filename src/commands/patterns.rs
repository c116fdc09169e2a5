use anyhow::{bail, Result};

use super::load_trades;
use crate::analysis::{analyze, Bucket, Dimension, PatternReport};
use crate::coach::{request_insights, CoachError, InsightGenerator};
use crate::repository::TradeRepository;

/// Breakdown sections in display order.
const BREAKDOWN_ORDER: [Dimension; 4] = [
    Dimension::Pair,
    Dimension::Hour,
    Dimension::Strategy,
    Dimension::Direction,
];

fn render_highlight(bucket: &Bucket) -> String {
    format!(
        "  {:<10} {:<14} {:>4.0}% WR  {}W / {}L",
        bucket.dimension.to_string(),
        bucket.key,
        bucket.win_rate,
        bucket.wins,
        bucket.losses
    )
}

pub fn render_report(report: &PatternReport, trade_count: usize) -> String {
    let mut out = vec![format!(
        "Statistical analysis of your {} trades.",
        trade_count
    )];

    out.push(String::new());
    out.push("Sweet Spots (High Win Rate)".to_string());
    if report.sweet_spots.is_empty() {
        out.push("  Not enough data to find consistent winning patterns.".to_string());
    } else {
        out.extend(report.sweet_spots.iter().map(render_highlight));
    }

    out.push(String::new());
    out.push("Danger Zones (Low Win Rate)".to_string());
    if report.danger_zones.is_empty() {
        out.push("  Great job! No consistent losing patterns found.".to_string());
    } else {
        out.extend(report.danger_zones.iter().map(render_highlight));
    }

    for dimension in BREAKDOWN_ORDER {
        out.push(String::new());
        out.push(dimension.title().to_string());
        for bucket in report.breakdown(dimension) {
            out.push(format!(
                "  {:<14} {:>4.0}%  ({} trades)",
                bucket.key, bucket.win_rate, bucket.total
            ));
        }
    }

    out.join("\n")
}

pub async fn run(repo: &mut TradeRepository) -> Result<()> {
    load_trades(repo).await?;
    let report = analyze(repo.trades());
    log::info!(
        "Pattern scan found {} sweet spots and {} danger zones",
        report.sweet_spots.len(),
        report.danger_zones.len()
    );
    println!("{}", render_report(&report, repo.trades().len()));
    Ok(())
}

/// Turns a coach failure into the message shown to the user. Rate limiting
/// gets its own wording.
pub fn describe_coach_error(err: &CoachError) -> String {
    match err {
        CoachError::RateLimited(message) => format!("AI Coach is rate limited: {}", message),
        CoachError::MissingApiKey => {
            "AI Coach needs a Gemini key: set GEMINI_API_KEY or pass --api-key".to_string()
        }
        other => format!("AI Coach Error: {}", other),
    }
}

pub async fn coach(repo: &mut TradeRepository, generator: &dyn InsightGenerator) -> Result<()> {
    load_trades(repo).await?;
    match request_insights(generator, repo.trades()).await {
        Ok(text) => {
            println!("AI Coach Insights\n\n{}", text);
            Ok(())
        }
        Err(err) => bail!(describe_coach_error(&err)),
    }
}
