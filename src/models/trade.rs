use std::fmt;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "Long",
            Direction::Short => "Short",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "long" => Some(Direction::Long),
            "short" => Some(Direction::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a trade. `BE` is the stored spelling of break-even.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TradeResult {
    Win,
    Lose,
    #[serde(rename = "BE")]
    BreakEven,
    #[default]
    Pending,
    /// Any value the store returns that is not one of the above.
    #[serde(other)]
    Unknown,
}

impl TradeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Win => "Win",
            TradeResult::Lose => "Lose",
            TradeResult::BreakEven => "BE",
            TradeResult::Pending => "Pending",
            TradeResult::Unknown => "Unknown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "win" => Some(TradeResult::Win),
            "lose" | "loss" => Some(TradeResult::Lose),
            "be" | "breakeven" | "break-even" => Some(TradeResult::BreakEven),
            "pending" => Some(TradeResult::Pending),
            _ => None,
        }
    }

    /// Win, Lose and BE are decided; everything else stays out of rate statistics.
    pub fn is_decided(&self) -> bool {
        matches!(
            self,
            TradeResult::Win | TradeResult::Lose | TradeResult::BreakEven
        )
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "text_or_null")]
    pub pair: String,
    #[serde(default, deserialize_with = "lenient_direction")]
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub entry_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub stop_loss: Option<f64>,
    #[serde(default, deserialize_with = "text_or_null")]
    pub timeframe: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub target_rr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub pnl: Option<f64>,
    #[serde(default, deserialize_with = "text_or_null")]
    pub setup: String,
    #[serde(default, deserialize_with = "text_or_null")]
    pub strategy: String,
    #[serde(default, deserialize_with = "lenient_result")]
    pub result: TradeResult,
    #[serde(default, deserialize_with = "text_or_null")]
    pub comment: String,
    #[serde(default)]
    pub chart_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_opaque_id")]
    pub user_id: Option<String>,
}

impl Trade {
    /// P&L as used in sums: absent or non-finite values count as zero.
    pub fn pnl_value(&self) -> f64 {
        self.pnl.filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

/// A trade as submitted by the user, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrade {
    pub date: NaiveDate,
    pub time: String,
    pub pair: String,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    pub timeframe: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_rr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    pub setup: String,
    pub strategy: String,
    pub result: TradeResult,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Default for NewTrade {
    /// Today's date and the current local time, Long, Win.
    fn default() -> Self {
        let now = Local::now();
        Self {
            date: now.date_naive(),
            time: now.format("%H:%M").to_string(),
            pair: String::new(),
            direction: Direction::Long,
            entry_price: None,
            stop_loss: None,
            timeframe: String::new(),
            target_rr: None,
            pnl: None,
            setup: String::new(),
            strategy: String::new(),
            result: TradeResult::Win,
            comment: String::new(),
            chart_url: None,
            user_id: None,
        }
    }
}

/// Partial update; only the fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_rr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TradeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_url: Option<String>,
}

impl TradeUpdate {
    pub fn is_empty(&self) -> bool {
        *self == TradeUpdate::default()
    }

    /// Apply the present fields onto an existing record.
    pub fn apply_to(&self, trade: &mut Trade) {
        if let Some(date) = self.date {
            trade.date = Some(date);
        }
        if let Some(time) = &self.time {
            trade.time = Some(time.clone());
        }
        if let Some(pair) = &self.pair {
            trade.pair = pair.clone();
        }
        if let Some(direction) = self.direction {
            trade.direction = Some(direction);
        }
        if let Some(v) = self.entry_price {
            trade.entry_price = Some(v);
        }
        if let Some(v) = self.stop_loss {
            trade.stop_loss = Some(v);
        }
        if let Some(timeframe) = &self.timeframe {
            trade.timeframe = timeframe.clone();
        }
        if let Some(v) = self.target_rr {
            trade.target_rr = Some(v);
        }
        if let Some(v) = self.pnl {
            trade.pnl = Some(v);
        }
        if let Some(setup) = &self.setup {
            trade.setup = setup.clone();
        }
        if let Some(strategy) = &self.strategy {
            trade.strategy = strategy.clone();
        }
        if let Some(result) = self.result {
            trade.result = result;
        }
        if let Some(comment) = &self.comment {
            trade.comment = comment.clone();
        }
        if let Some(chart_url) = &self.chart_url {
            trade.chart_url = Some(chart_url.clone());
        }
    }
}

// Store rows may carry numeric ids or numbers serialized as strings; the
// helpers below accept both shapes.

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

pub(crate) fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

fn optional_opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    }))
}

fn text_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

/// Numbers pass through, numeric strings are parsed, "" is absent. A string
/// that does not parse is logged and dropped.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawNumber>::deserialize(deserializer)? {
        None => None,
        Some(RawNumber::Number(n)) => Some(n),
        Some(RawNumber::Text(s)) => parse_numeric(&s),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn raw_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawText>::deserialize(deserializer)? {
        Some(RawText::Text(s)) => Some(s),
        Some(RawText::Other(_)) | None => None,
    })
}

/// A present but null or unrecognised result is `Unknown`; an absent one
/// keeps the `Pending` default.
fn lenient_result<'de, D>(deserializer: D) -> Result<TradeResult, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_text(deserializer)?
        .as_deref()
        .and_then(TradeResult::parse)
        .unwrap_or(TradeResult::Unknown))
}

fn lenient_direction<'de, D>(deserializer: D) -> Result<Option<Direction>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = raw_text(deserializer)?;
    let direction = raw.as_deref().and_then(Direction::parse);
    if let Some(raw) = raw.filter(|r| !r.trim().is_empty() && direction.is_none()) {
        log::warn!("Ignoring unknown direction {:?}", raw);
    }
    Ok(direction)
}

/// `YYYY-MM-DD`, or the date part of a timestamp. Anything else is absent.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = raw_text(deserializer)? else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    let date = trimmed
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    if date.is_none() && !trimmed.is_empty() {
        log::warn!("Ignoring unparseable date {:?}", raw);
    }
    Ok(date)
}

pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_text(deserializer)?.and_then(|raw| {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}

pub(crate) fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring non-numeric value {:?}", raw);
            None
        }
    }
}
