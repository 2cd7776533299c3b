//! Delivery-ready metric point.

use serde::{Deserialize, Serialize};

/// A single named value at a unix timestamp, ready to be posted upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub time: i64,
    pub value: f64,
}

impl Metric {
    pub fn new(name: impl Into<String>, time: i64, value: f64) -> Self {
        Self {
            name: name.into(),
            time,
            value,
        }
    }
}
