use serde::{Deserialize, Serialize};

/// A derived `{ key, value }` pair summarizing one or more records. Within one result set, no two
/// buckets share a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBucket {
    key: String,
    value: f64,
}

impl AggregateBucket {
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn add(&mut self, amount: f64) {
        self.value += amount;
    }

    pub(crate) fn raise_to(&mut self, amount: f64) {
        if amount > self.value {
            self.value = amount;
        }
    }
}
