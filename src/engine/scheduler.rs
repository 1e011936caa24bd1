use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{StreamExt, future, stream};
use tokio::time::{Instant, MissedTickBehavior, interval, sleep, timeout};
use tokio_util::sync::CancellationToken;

use super::compute::ComputationEngine;
use super::ingest::IngestionCoordinator;
use super::messages::{ComputeOutcome, CycleReport, MarketReport, PipelineError};
use crate::config::PipelineConfig;
use crate::data::{IngestStatusStore, MarketDataProvider, MarketDataStorage, MetricsRepositoryTrait};
use crate::utils::format_duration;

/// Periodic driver: owns the tracked market list and runs ingest then compute
/// for every market on a bounded pool, once per cycle.
pub struct CycleScheduler {
    provider: Arc<dyn MarketDataProvider>,
    ingestor: IngestionCoordinator,
    engine: ComputationEngine,
    config: PipelineConfig,

    markets: Vec<String>,
    last_discovery: Option<Instant>,
}

impl CycleScheduler {
    pub fn new<S>(
        provider: Arc<dyn MarketDataProvider>,
        storage: Arc<S>,
        metrics: Arc<dyn MetricsRepositoryTrait>,
        config: PipelineConfig,
    ) -> Result<Self>
    where
        S: MarketDataStorage + IngestStatusStore + 'static,
    {
        config.validate().context("invalid scheduler configuration")?;

        let candles: Arc<dyn MarketDataStorage> = storage.clone();
        let status: Arc<dyn IngestStatusStore> = storage;

        let ingestor = IngestionCoordinator::new(
            provider.clone(),
            candles.clone(),
            status,
            config.resolution,
            config.fetch_limit,
            config.fetch_timeout,
        );
        let engine = ComputationEngine::new(
            candles,
            metrics,
            config.resolution,
            config.lookback,
            config.min_candles,
            config.indicators,
        );

        Ok(Self {
            provider,
            ingestor,
            engine,
            config,
            markets: Vec::new(),
            last_discovery: None,
        })
    }

    /// The market list the next cycle will process.
    pub fn markets(&self) -> &[String] {
        &self.markets
    }

    /// Ticks every `cycle_interval` until `shutdown` fires. A cycle that
    /// overruns its interval swallows the missed ticks.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        let mut ticker = interval(self.config.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "Scheduler started: every {} at {} resolution, {} worker(s)",
            format_duration(self.config.cycle_interval.as_millis() as i64),
            self.config.resolution,
            self.config.workers
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let report = self.run_once(&shutdown).await;
            report.log_summary();
        }

        log::info!("Scheduler stopped");
        Ok(())
    }

    /// Refreshes the market list if due, then runs one cycle over it.
    pub async fn run_once(&mut self, shutdown: &CancellationToken) -> CycleReport {
        if let Err(e) = self.refresh_markets().await {
            if self.markets.is_empty() {
                log::error!("Market discovery failed and no previous list exists: {:#}", e);
            } else {
                log::warn!(
                    "Market discovery failed, keeping previous {} market(s): {:#}",
                    self.markets.len(),
                    e
                );
            }
        }

        let markets = self.markets.clone();
        self.run_cycle(&markets, shutdown).await
    }

    /// Replaces the tracked list with pinned markets, or with a fresh discovery
    /// once `discovery_interval` has elapsed. The old list survives a failure.
    pub async fn refresh_markets(&mut self) -> Result<()> {
        if !self.config.pinned_markets.is_empty() {
            if self.markets != self.config.pinned_markets {
                self.markets = self.config.pinned_markets.clone();
                log::info!("Tracking {} pinned market(s)", self.markets.len());
            }
            return Ok(());
        }

        let due = self
            .last_discovery
            .is_none_or(|at| at.elapsed() >= self.config.discovery_interval);
        if !due {
            return Ok(());
        }

        let discovered = timeout(self.config.fetch_timeout, self.provider.list_markets())
            .await
            .context("market discovery timed out")??;

        log::info!("Discovered {} market(s)", discovered.len());
        self.markets = discovered;
        self.last_discovery = Some(Instant::now());
        Ok(())
    }

    /// One pass over `markets`. Dispatch stops early on shutdown or once the
    /// cycle deadline has passed; markets already dispatched run to completion.
    pub async fn run_cycle(&self, markets: &[String], shutdown: &CancellationToken) -> CycleReport {
        let started = Instant::now();
        let deadline = started + self.config.cycle_deadline;
        let pacing = self.config.pacing;

        let reports: Vec<MarketReport> = stream::iter(markets.iter().enumerate())
            .then(move |(i, market_id)| async move {
                if i > 0 && !pacing.is_zero() {
                    tokio::select! {
                        _ = sleep(pacing) => {}
                        _ = shutdown.cancelled() => {}
                    }
                }
                market_id
            })
            .take_while(|_| future::ready(!shutdown.is_cancelled() && Instant::now() < deadline))
            .map(|market_id| self.process_market(market_id))
            .buffer_unordered(self.config.workers)
            .collect()
            .await;

        let not_dispatched = markets.len() - reports.len();
        if not_dispatched > 0 {
            if shutdown.is_cancelled() {
                log::info!("Shutdown requested, {} market(s) not dispatched", not_dispatched);
            } else {
                log::warn!("Cycle deadline reached, {} market(s) not dispatched", not_dispatched);
            }
        }

        CycleReport {
            markets: reports,
            not_dispatched,
            elapsed: started.elapsed(),
        }
    }

    /// Ingest then compute for one market. Compute still runs after a
    /// transport failure so stored history keeps producing snapshots; a
    /// storage failure ends the market's iteration.
    async fn process_market(&self, market_id: &str) -> MarketReport {
        let ingest = self.ingestor.ingest(market_id).await;
        let compute = match &ingest.error {
            Some(PipelineError::Storage(_)) => Ok(ComputeOutcome::NotAttempted),
            _ => self.engine.compute(market_id).await,
        };
        if let Err(e) = &compute {
            log::warn!("{}: compute failed: {}", market_id, e);
        }

        MarketReport {
            market_id: market_id.to_string(),
            ingest,
            compute,
        }
    }
}
