use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// One computed-indicator row, keyed by `(market_id, timestamp)` where
/// `timestamp` is the newest candle that fed the computation.
///
/// Every indicator is `None` exactly when its window could not be filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub market_id: String,
    pub timestamp: i64,

    pub volatility_1h: Option<f64>,
    pub volatility_4h: Option<f64>,
    pub volatility_24h: Option<f64>,

    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,

    pub atr: Option<f64>,
    pub momentum: Option<f64>,
}

impl MetricsSnapshot {
    pub fn empty(market_id: &str, timestamp: i64) -> Self {
        Self {
            market_id: market_id.to_string(),
            timestamp,
            volatility_1h: None,
            volatility_4h: None,
            volatility_24h: None,
            bollinger_upper: None,
            bollinger_middle: None,
            bollinger_lower: None,
            atr: None,
            momentum: None,
        }
    }

    /// True if at least one indicator was computable.
    pub fn has_any_value(&self) -> bool {
        [
            self.volatility_1h,
            self.volatility_4h,
            self.volatility_24h,
            self.bollinger_upper,
            self.bollinger_middle,
            self.bollinger_lower,
            self.atr,
            self.momentum,
        ]
        .iter()
        .any(Option::is_some)
    }
}

/// Per-market ingestion bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestStatus {
    pub market_id: String,
    pub last_candle_timestamp: Option<i64>,
    pub last_ingested_at: Option<DateTime<Utc>>,
    /// Consecutive failures, reset on success.
    pub error_count: u32,
    pub last_error: Option<String>,
}
