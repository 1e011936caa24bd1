//! Shared fixtures for the integration tests: an on-disk SQLite pair and a
//! scripted in-memory market data provider.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tempfile::TempDir;

use volmetrics::{
    Candle, PipelineConfig, Resolution,
    data::{
        MarketDataProvider, MarketDataStorage, MetricsRepositoryTrait, RawCandle,
        SqliteMetricsRepository, SqliteStorage, TimestampUnit,
    },
};

pub const HOUR: i64 = 3600;
/// 2024-01-01T00:00:00Z
pub const T0: i64 = 1_704_067_200;

pub struct TestStores {
    // Held so the database file outlives the test.
    pub dir: TempDir,
    pub candles: Arc<SqliteStorage>,
    pub metrics: Arc<SqliteMetricsRepository>,
}

pub async fn open_stores() -> TestStores {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("volmetrics.sqlite");
    let path = path.to_str().unwrap();

    let candles = SqliteStorage::new(path).await.unwrap();
    candles.initialize().await.unwrap();
    let metrics = SqliteMetricsRepository::new(path).await.unwrap();
    metrics.initialize().await.unwrap();

    TestStores {
        dir,
        candles: Arc::new(candles),
        metrics: Arc::new(metrics),
    }
}

/// Hourly candles from `T0` with closes `start, start+1, ...`.
pub fn rising_candles(n: usize, start: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = start + i as f64;
            Candle::new(T0 + i as i64 * HOUR, close - 0.5, close + 1.0, close - 1.0, close, 100.0)
        })
        .collect()
}

pub fn raw(candles: &[Candle], unit: TimestampUnit) -> Vec<RawCandle> {
    let scale = match unit {
        TimestampUnit::Seconds => 1,
        TimestampUnit::Milliseconds => 1000,
    };
    candles
        .iter()
        .map(|c| RawCandle {
            timestamp: c.timestamp * scale,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        })
        .collect()
}

/// Config for tests: hourly, no pacing, short timeout.
pub fn test_config(markets: &[&str]) -> PipelineConfig {
    PipelineConfig {
        pinned_markets: markets.iter().map(|m| m.to_string()).collect(),
        pacing: Duration::ZERO,
        fetch_timeout: Duration::from_millis(200),
        resolution: Resolution::H1,
        ..PipelineConfig::default()
    }
}

#[derive(Clone)]
pub enum Script {
    Candles(Vec<RawCandle>),
    Fail(String),
    Hang,
}

/// Provider answering from a per-market script. Unscripted markets return no candles.
pub struct FakeProvider {
    unit: TimestampUnit,
    markets: Mutex<Vec<String>>,
    scripts: Mutex<HashMap<String, Script>>,
    discovery_fails: AtomicBool,
    fetch_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub discovery_calls: AtomicUsize,
    /// Highest number of fetches seen running at once.
    pub peak_in_flight: AtomicUsize,
}

impl FakeProvider {
    pub fn new(unit: TimestampUnit) -> Self {
        Self {
            unit,
            markets: Mutex::new(Vec::new()),
            scripts: Mutex::new(HashMap::new()),
            discovery_fails: AtomicBool::new(false),
            fetch_delay: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            discovery_calls: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_markets(self, markets: &[&str]) -> Self {
        *self.markets.lock().unwrap() = markets.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn script(&self, market_id: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(market_id.to_string(), script);
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.discovery_fails.store(fail, Ordering::SeqCst);
    }

    /// Every fetch sleeps this long before answering.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl MarketDataProvider for FakeProvider {
    fn timestamp_unit(&self) -> TimestampUnit {
        self.unit
    }

    async fn list_markets(&self) -> Result<Vec<String>> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        if self.discovery_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("discovery endpoint unavailable"));
        }
        Ok(self.markets.lock().unwrap().clone())
    }

    async fn fetch_candles(
        &self,
        market_id: &str,
        _resolution: Resolution,
        limit: u32,
    ) -> Result<Vec<RawCandle>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        let script = self.scripts.lock().unwrap().get(market_id).cloned();
        match script {
            None => Ok(Vec::new()),
            Some(Script::Candles(candles)) => {
                let skip = candles.len().saturating_sub(limit as usize);
                Ok(candles[skip..].to_vec())
            }
            Some(Script::Fail(msg)) => Err(anyhow!(msg)),
            Some(Script::Hang) => futures::future::pending().await,
        }
    }
}
