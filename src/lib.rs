#![allow(clippy::too_many_arguments)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod utils;

// Re-export commonly used types outside of crate (for main.rs and tests)
pub use config::{PERSISTENCE, PIPELINE, PipelineConfig};
pub use domain::{Candle, IngestStatus, MetricsSnapshot, Resolution};
pub use engine::{CycleReport, CycleScheduler};

use {
    anyhow::{Context, Result},
    clap::Parser,
    config::{BINANCE, INDICATORS},
    data::{
        BinanceProvider, GlobalRateLimiter, MarketDataStorage, MetricsRepositoryTrait,
        SqliteMetricsRepository, SqliteStorage,
    },
    std::sync::Arc,
    tokio_util::sync::CancellationToken,
};

// CLI argument parsing
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Track exactly these markets (comma separated) instead of discovering them
    #[arg(long, env = "VOLMETRICS_MARKETS", value_delimiter = ',')]
    pub markets: Vec<String>,

    /// Quote assets a discovered market must trade against
    #[arg(long, env = "VOLMETRICS_QUOTE_ASSETS", value_delimiter = ',',
          default_values_t = BINANCE.discovery.quote_assets.iter().map(|q| q.to_string()).collect::<Vec<_>>())]
    pub quote_assets: Vec<String>,

    /// Upper bound on the number of discovered markets
    #[arg(long, env = "VOLMETRICS_MAX_MARKETS", default_value_t = BINANCE.discovery.max_markets)]
    pub max_markets: usize,

    /// SQLite database file holding candles, ingest status and metrics
    #[arg(long, env = "VOLMETRICS_DB_PATH", default_value_t = PERSISTENCE.sqlite.db_path.to_string())]
    pub db_path: String,

    /// Candle resolution in seconds
    #[arg(long, env = "VOLMETRICS_RESOLUTION_SECS", default_value_t = PIPELINE.fetch.resolution_secs)]
    pub resolution_secs: u32,

    /// Most recent candles requested per market per cycle
    #[arg(long, env = "VOLMETRICS_FETCH_LIMIT", default_value_t = PIPELINE.fetch.limit)]
    pub fetch_limit: u32,

    #[arg(long, env = "VOLMETRICS_FETCH_TIMEOUT_MS", default_value_t = PIPELINE.fetch.timeout.as_millis() as u64)]
    pub fetch_timeout_ms: u64,

    /// Delay between market dispatches within a cycle
    #[arg(long, env = "VOLMETRICS_PACING_MS", default_value_t = PIPELINE.fetch.pacing.as_millis() as u64)]
    pub pacing_ms: u64,

    /// Markets processed concurrently
    #[arg(long, env = "VOLMETRICS_WORKERS", default_value_t = PIPELINE.fetch.workers)]
    pub workers: usize,

    /// Candles read back for each computation
    #[arg(long, env = "VOLMETRICS_LOOKBACK", default_value_t = PIPELINE.window.lookback)]
    pub lookback: u32,

    /// Below this many stored candles no metrics are written
    #[arg(long, env = "VOLMETRICS_MIN_CANDLES", default_value_t = PIPELINE.window.min_candles)]
    pub min_candles: usize,

    #[arg(long, env = "VOLMETRICS_CYCLE_INTERVAL_SECS", default_value_t = PIPELINE.cadence.cycle_interval.as_secs())]
    pub cycle_interval_secs: u64,

    #[arg(long, env = "VOLMETRICS_DISCOVERY_INTERVAL_SECS", default_value_t = PIPELINE.cadence.discovery_interval.as_secs())]
    pub discovery_interval_secs: u64,

    /// No new markets are dispatched once a cycle has run this long
    #[arg(long, env = "VOLMETRICS_CYCLE_DEADLINE_SECS", default_value_t = PIPELINE.cadence.cycle_deadline.as_secs())]
    pub cycle_deadline_secs: u64,

    #[arg(long, env = "VOLMETRICS_BOLLINGER_WINDOW", default_value_t = INDICATORS.bollinger_window)]
    pub bollinger_window: usize,

    #[arg(long, env = "VOLMETRICS_BOLLINGER_K", default_value_t = INDICATORS.bollinger_k)]
    pub bollinger_k: f64,

    #[arg(long, env = "VOLMETRICS_ATR_WINDOW", default_value_t = INDICATORS.atr_window)]
    pub atr_window: usize,

    #[arg(long, env = "VOLMETRICS_MOMENTUM_WINDOW", default_value_t = INDICATORS.momentum_window)]
    pub momentum_window: usize,

    /// Run a single cycle and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,
}

/// Pipeline entry point: opens the stores, builds the Binance adapter and
/// drives cycles until `shutdown` fires (or once, with `--once`).
pub async fn run_pipeline(args: Cli, shutdown: CancellationToken) -> Result<()> {
    let config = PipelineConfig::from_cli(&args).context("invalid configuration")?;

    let storage = Arc::new(SqliteStorage::new(&config.db_path).await?);
    storage.initialize().await?;
    let metrics: Arc<dyn MetricsRepositoryTrait> =
        Arc::new(SqliteMetricsRepository::new(&config.db_path).await?);
    metrics.initialize().await?;
    log::info!("Stores ready at {}", config.db_path);

    let limiter = GlobalRateLimiter::new(BINANCE.limits.weight_limit_minute);
    let provider =
        Arc::new(BinanceProvider::new(limiter).with_discovery(args.quote_assets, args.max_markets));

    let mut scheduler = CycleScheduler::new(provider, storage, metrics, config)?;

    if args.once {
        let report = scheduler.run_once(&shutdown).await;
        report.log_summary();
        return Ok(());
    }

    scheduler.run(shutdown).await
}
