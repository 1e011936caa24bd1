mod binance;
mod metrics_repo;
mod provider;
mod rate_limiter;
mod storage;

pub use {
    binance::{BinanceError, BinanceProvider},
    metrics_repo::{MetricsRepositoryTrait, SqliteMetricsRepository},
    provider::{MarketDataProvider, RawCandle, TimestampUnit},
    rate_limiter::GlobalRateLimiter,
    storage::{IngestStatusStore, MarketDataStorage, SqliteStorage},
};
