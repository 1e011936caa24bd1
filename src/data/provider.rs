use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Candle, Resolution};

/// Unit of the timestamps an upstream source reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Seconds,
    Milliseconds,
}

impl TimestampUnit {
    /// Normalizes an upstream timestamp to Unix seconds.
    pub fn to_seconds(self, ts: i64) -> i64 {
        match self {
            TimestampUnit::Seconds => ts,
            TimestampUnit::Milliseconds => ts.div_euclid(crate::utils::TimeUtils::MS_IN_S),
        }
    }
}

/// A candle exactly as the source returned it; `timestamp` is in the
/// provider's declared [`TimestampUnit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCandle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawCandle {
    pub fn normalize(self, unit: TimestampUnit) -> Candle {
        Candle::new(
            unit.to_seconds(self.timestamp),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        )
    }
}

/// Abstract interface for fetching market data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unit of every timestamp returned by `fetch_candles`.
    fn timestamp_unit(&self) -> TimestampUnit;

    /// Discover the markets currently worth tracking.
    async fn list_markets(&self) -> Result<Vec<String>>;

    /// Fetch up to `limit` of the most recent candles for a market.
    async fn fetch_candles(
        &self,
        market_id: &str,
        resolution: Resolution,
        limit: u32,
    ) -> Result<Vec<RawCandle>>;
}
