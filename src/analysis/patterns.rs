use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Trade, TradeResult};

/// Buckets with fewer decided trades than this never rank.
pub const MIN_SAMPLE_SIZE: u32 = 3;
pub const SWEET_SPOT_MIN_WIN_RATE: f64 = 70.0;
pub const DANGER_ZONE_MAX_WIN_RATE: f64 = 40.0;
/// Rows shown per dimension in the breakdown.
pub const BREAKDOWN_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Hour,
    Pair,
    Strategy,
    Direction,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Hour,
        Dimension::Pair,
        Dimension::Strategy,
        Dimension::Direction,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Hour => "Best Times",
            Dimension::Pair => "Best Pairs",
            Dimension::Strategy => "Best Strategies",
            Dimension::Direction => "Direction",
        }
    }

    /// Grouping key of `trade` in this dimension, or `None` when the trade
    /// has no usable value for it.
    fn key_of(&self, trade: &Trade) -> Option<String> {
        match self {
            Dimension::Hour => trade.time.as_deref().and_then(hour_key),
            Dimension::Pair => non_empty(&trade.pair),
            Dimension::Strategy => non_empty(&trade.strategy),
            Dimension::Direction => trade.direction.map(|d| d.as_str().to_string()),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Hour => "hour",
            Dimension::Pair => "pair",
            Dimension::Strategy => "strategy",
            Dimension::Direction => "direction",
        };
        f.write_str(name)
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// "9:05" -> "09:00", "14:30:00" -> "14:00". The hour must be a clock hour
/// (0 to 23): "25:00" or "noon" yield `None`, and the trade is left out of
/// the hour dimension only.
pub fn hour_key(time: &str) -> Option<String> {
    let hour: u32 = time.split(':').next()?.trim().parse().ok()?;
    if hour > 23 {
        return None;
    }
    Some(format!("{:02}:00", hour))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub dimension: Dimension,
    pub key: String,
    pub wins: u32,
    pub losses: u32,
    /// Wins, losses and break-evens.
    pub total: u32,
    pub pnl: f64,
    pub win_rate: f64,
}

impl Bucket {
    fn new(dimension: Dimension, key: String) -> Self {
        Self {
            dimension,
            key,
            wins: 0,
            losses: 0,
            total: 0,
            pnl: 0.0,
            win_rate: 0.0,
        }
    }

    fn record(&mut self, trade: &Trade) {
        self.total += 1;
        match trade.result {
            TradeResult::Win => self.wins += 1,
            TradeResult::Lose => self.losses += 1,
            _ => {}
        }
        self.pnl += trade.pnl_value();
    }

    pub fn breakevens(&self) -> u32 {
        self.total - self.wins - self.losses
    }

    pub fn is_sweet_spot(&self) -> bool {
        self.total >= MIN_SAMPLE_SIZE && self.win_rate >= SWEET_SPOT_MIN_WIN_RATE
    }

    pub fn is_danger_zone(&self) -> bool {
        self.total >= MIN_SAMPLE_SIZE && self.win_rate <= DANGER_ZONE_MAX_WIN_RATE
    }
}

/// Win percentage over wins, losses and break-evens; 0 when empty.
pub fn win_rate(wins: u32, total: u32) -> f64 {
    if total > 0 {
        wins as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Per-value statistics of one dimension, in first-seen order.
#[derive(Debug, Default)]
struct Grouping {
    index: HashMap<String, usize>,
    buckets: Vec<Bucket>,
}

impl Grouping {
    fn record(&mut self, dimension: Dimension, key: String, trade: &Trade) {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.buckets.push(Bucket::new(dimension, key.clone()));
                self.index.insert(key, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        self.buckets[slot].record(trade);
    }

    fn finish(mut self) -> Vec<Bucket> {
        for bucket in &mut self.buckets {
            bucket.win_rate = win_rate(bucket.wins, bucket.total);
        }
        self.buckets
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub hourly: Vec<Bucket>,
    pub pairs: Vec<Bucket>,
    pub strategies: Vec<Bucket>,
    pub directions: Vec<Bucket>,
    /// Highest win rate first.
    pub sweet_spots: Vec<Bucket>,
    /// Lowest win rate first.
    pub danger_zones: Vec<Bucket>,
}

impl PatternReport {
    pub fn buckets(&self, dimension: Dimension) -> &[Bucket] {
        match dimension {
            Dimension::Hour => &self.hourly,
            Dimension::Pair => &self.pairs,
            Dimension::Strategy => &self.strategies,
            Dimension::Direction => &self.directions,
        }
    }

    /// The most-observed buckets of a dimension, at most [`BREAKDOWN_LIMIT`].
    pub fn breakdown(&self, dimension: Dimension) -> Vec<Bucket> {
        top_by_total(self.buckets(dimension))
    }
}

pub fn top_by_total(buckets: &[Bucket]) -> Vec<Bucket> {
    let mut sorted = buckets.to_vec();
    sorted.sort_by(|a, b| b.total.cmp(&a.total));
    sorted.truncate(BREAKDOWN_LIMIT);
    sorted
}

/// Groups decided trades by hour, pair, strategy and direction and ranks
/// the resulting buckets. Pending and unknown results contribute nowhere.
pub fn analyze(trades: &[Trade]) -> PatternReport {
    let mut groupings: [Grouping; 4] = Default::default();

    for trade in trades.iter().filter(|t| t.result.is_decided()) {
        for (dimension, grouping) in Dimension::ALL.iter().zip(groupings.iter_mut()) {
            if let Some(key) = dimension.key_of(trade) {
                grouping.record(*dimension, key, trade);
            }
        }
    }

    let [hourly, pairs, strategies, directions] = groupings.map(Grouping::finish);

    let pooled: Vec<&Bucket> = hourly
        .iter()
        .chain(&pairs)
        .chain(&strategies)
        .chain(&directions)
        .collect();

    let mut sweet_spots: Vec<Bucket> = pooled
        .iter()
        .filter(|b| b.is_sweet_spot())
        .map(|b| (*b).clone())
        .collect();
    sweet_spots.sort_by(|a, b| b.win_rate.total_cmp(&a.win_rate));

    let mut danger_zones: Vec<Bucket> = pooled
        .iter()
        .filter(|b| b.is_danger_zone())
        .map(|b| (*b).clone())
        .collect();
    danger_zones.sort_by(|a, b| a.win_rate.total_cmp(&b.win_rate));

    PatternReport {
        hourly,
        pairs,
        strategies,
        directions,
        sweet_spots,
        danger_zones,
    }
}
