use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fetched data item reduced to what the metrics need: a number, the category it belongs to
/// and when it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Record {
    amount: f64,
    category: String,
    timestamp: DateTime<Utc>,
}

impl Record {
    pub fn new(amount: f64, category: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            amount,
            category: category.into(),
            timestamp,
        }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
