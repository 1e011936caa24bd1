//! Pipeline cadence, pool sizing and indicator windows.

use {
    crate::{Cli, domain::Resolution},
    anyhow::{Result, bail},
    itertools::Itertools,
    std::time::Duration,
};

pub struct CadenceDefaults {
    pub cycle_interval: Duration,
    pub discovery_interval: Duration,
    /// A cycle stops dispatching new markets once it has run this long.
    pub cycle_deadline: Duration,
}

pub struct FetchDefaults {
    pub resolution_secs: u32,
    pub limit: u32,
    pub timeout: Duration,
    pub pacing: Duration,
    pub workers: usize,
}

pub struct WindowDefaults {
    pub lookback: u32,
    pub min_candles: usize,
}

pub struct PipelineDefaults {
    pub cadence: CadenceDefaults,
    pub fetch: FetchDefaults,
    pub window: WindowDefaults,
}

pub const PIPELINE: PipelineDefaults = PipelineDefaults {
    cadence: CadenceDefaults {
        cycle_interval: Duration::from_secs(5 * 60),
        discovery_interval: Duration::from_secs(60 * 60),
        cycle_deadline: Duration::from_secs(10 * 60),
    },
    fetch: FetchDefaults {
        resolution_secs: 3600,
        limit: 100,
        timeout: Duration::from_secs(10),
        pacing: Duration::from_millis(1000),
        workers: 4,
    },
    window: WindowDefaults {
        lookback: 500,
        min_candles: 30,
    },
};

/// Rolling window sizes (in candles) and band width for the indicator set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSettings {
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub atr_window: usize,
    pub momentum_window: usize,
}

impl IndicatorSettings {
    /// Wall-clock horizons of the three realized-volatility windows.
    pub const VOLATILITY_HORIZONS: [Duration; 3] = [
        Duration::from_secs(60 * 60),
        Duration::from_secs(4 * 60 * 60),
        Duration::from_secs(24 * 60 * 60),
    ];
}

pub const INDICATORS: IndicatorSettings = IndicatorSettings {
    bollinger_window: 20,
    bollinger_k: 2.0,
    atr_window: 14,
    momentum_window: 12,
};

impl Default for IndicatorSettings {
    fn default() -> Self {
        INDICATORS
    }
}

/// Validated runtime configuration, assembled from CLI args / environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub db_path: String,
    pub resolution: Resolution,
    pub fetch_limit: u32,
    pub fetch_timeout: Duration,
    pub pacing: Duration,
    pub workers: usize,
    pub lookback: u32,
    pub min_candles: usize,
    pub cycle_interval: Duration,
    pub discovery_interval: Duration,
    pub cycle_deadline: Duration,
    /// When non-empty, discovery is skipped and exactly these markets are tracked.
    pub pinned_markets: Vec<String>,
    pub indicators: IndicatorSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: crate::config::PERSISTENCE.sqlite.db_path.to_string(),
            resolution: Resolution::from_secs(PIPELINE.fetch.resolution_secs),
            fetch_limit: PIPELINE.fetch.limit,
            fetch_timeout: PIPELINE.fetch.timeout,
            pacing: PIPELINE.fetch.pacing,
            workers: PIPELINE.fetch.workers,
            lookback: PIPELINE.window.lookback,
            min_candles: PIPELINE.window.min_candles,
            cycle_interval: PIPELINE.cadence.cycle_interval,
            discovery_interval: PIPELINE.cadence.discovery_interval,
            cycle_deadline: PIPELINE.cadence.cycle_deadline,
            pinned_markets: Vec::new(),
            indicators: INDICATORS,
        }
    }
}

impl PipelineConfig {
    pub fn from_cli(args: &Cli) -> Result<Self> {
        let pinned_markets = args
            .markets
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unique()
            .collect();

        let config = Self {
            db_path: args.db_path.clone(),
            resolution: Resolution::from_secs(args.resolution_secs),
            fetch_limit: args.fetch_limit,
            fetch_timeout: Duration::from_millis(args.fetch_timeout_ms),
            pacing: Duration::from_millis(args.pacing_ms),
            workers: args.workers,
            lookback: args.lookback,
            min_candles: args.min_candles,
            cycle_interval: Duration::from_secs(args.cycle_interval_secs),
            discovery_interval: Duration::from_secs(args.discovery_interval_secs),
            cycle_deadline: Duration::from_secs(args.cycle_deadline_secs),
            pinned_markets,
            indicators: IndicatorSettings {
                bollinger_window: args.bollinger_window,
                bollinger_k: args.bollinger_k,
                atr_window: args.atr_window,
                momentum_window: args.momentum_window,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution.secs() == 0 {
            bail!("resolution must be a positive number of seconds");
        }
        if self.workers == 0 {
            bail!("worker pool size must be at least 1");
        }
        if self.fetch_limit == 0 {
            bail!("fetch limit must be at least 1");
        }
        if self.cycle_interval.is_zero() || self.discovery_interval.is_zero() {
            bail!("cycle and discovery intervals must be non-zero");
        }
        if self.fetch_timeout.is_zero() {
            bail!("fetch timeout must be non-zero");
        }
        let ind = &self.indicators;
        if ind.bollinger_window < 2 || ind.atr_window == 0 || ind.momentum_window == 0 {
            bail!(
                "invalid indicator windows: bollinger={} atr={} momentum={}",
                ind.bollinger_window,
                ind.atr_window,
                ind.momentum_window
            );
        }
        if !ind.bollinger_k.is_finite() || ind.bollinger_k < 0.0 {
            bail!("bollinger k must be a finite non-negative number");
        }
        if (self.lookback as usize) < self.min_candles {
            bail!(
                "lookback ({}) is smaller than the minimum candle threshold ({})",
                self.lookback,
                self.min_candles
            );
        }
        Ok(())
    }
}
