pub mod dashboard;
pub mod patterns;

pub use dashboard::{dashboard_stats, DashboardStats};
pub use patterns::{analyze, Bucket, Dimension, PatternReport};
