use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single strategy/notes row of a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDocument {
    #[serde(deserialize_with = "crate::models::trade::opaque_id")]
    pub id: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "crate::models::trade::lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPayload {
    pub strategy: String,
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}
