use std::{sync::Arc, time::Duration};

use tokio::time::timeout;

use super::messages::{IngestOutcome, PipelineError, SkipReason, SkippedCandle};
use crate::data::{IngestStatusStore, MarketDataProvider, MarketDataStorage, RawCandle};
use crate::domain::Resolution;
use crate::utils::{epoch_sec_to_utc, now_utc};

/// Pulls the most recent candles for one market and merges them into the candle store.
pub struct IngestionCoordinator {
    provider: Arc<dyn MarketDataProvider>,
    candles: Arc<dyn MarketDataStorage>,
    status: Arc<dyn IngestStatusStore>,
    resolution: Resolution,
    fetch_limit: u32,
    fetch_timeout: Duration,
}

impl IngestionCoordinator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        candles: Arc<dyn MarketDataStorage>,
        status: Arc<dyn IngestStatusStore>,
        resolution: Resolution,
        fetch_limit: u32,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            candles,
            status,
            resolution,
            fetch_limit,
            fetch_timeout,
        }
    }

    /// One fetch-merge pass. Failures are recorded in the market's ingest
    /// status and returned in the outcome; nothing is retried here.
    pub async fn ingest(&self, market_id: &str) -> IngestOutcome {
        let fetched = match self.fetch(market_id).await {
            Ok(candles) => candles,
            Err(error) => return self.fail(market_id, IngestOutcome::default(), error).await,
        };

        let mut outcome = IngestOutcome::default();
        if fetched.is_empty() {
            log::debug!("{}: no candles returned this cycle", market_id);
        }

        let previous_last = match self.candles.last_timestamp(market_id, self.resolution).await {
            Ok(ts) => ts,
            Err(e) => return self.fail(market_id, outcome, PipelineError::storage(&e)).await,
        };

        let unit = self.provider.timestamp_unit();
        let mut newest: Option<i64> = None;
        let mut oldest: Option<i64> = None;

        for raw in fetched {
            let candle = raw.normalize(unit);

            let reason = if candle.timestamp <= 0 {
                Some(SkipReason::NonPositiveTimestamp)
            } else if !candle.is_finite() {
                Some(SkipReason::NonFiniteValue)
            } else {
                None
            };
            if let Some(reason) = reason {
                outcome.skipped.push(SkippedCandle {
                    timestamp: candle.timestamp,
                    reason,
                });
                continue;
            }

            if let Err(e) = self
                .candles
                .upsert_candle(market_id, self.resolution, &candle)
                .await
            {
                return self.fail(market_id, outcome, PipelineError::storage(&e)).await;
            }

            outcome.candles_merged += 1;
            newest = newest.max(Some(candle.timestamp));
            oldest = Some(oldest.map_or(candle.timestamp, |o: i64| o.min(candle.timestamp)));
        }

        for skipped in &outcome.skipped {
            log::warn!(
                "{}: skipped candle at {}: {}",
                market_id,
                skipped.timestamp,
                skipped.reason
            );
        }

        if let (Some(prev), Some(first)) = (previous_last, oldest) {
            let step = i64::from(self.resolution.secs());
            if first > prev + step {
                log::warn!(
                    "{}: gap of {} candle(s) between stored history ({}) and fetched window ({})",
                    market_id,
                    (first - prev) / step - 1,
                    epoch_sec_to_utc(prev),
                    epoch_sec_to_utc(first)
                );
            }
        }

        if let Err(e) = self
            .status
            .record_ingest_success(market_id, newest, now_utc())
            .await
        {
            // Candles are merged but bookkeeping is stale; treat as a storage failure.
            outcome.error = Some(PipelineError::storage(&e));
            log::error!("{}: {}", market_id, PipelineError::storage(&e));
            return outcome;
        }

        log::debug!(
            "{}: merged {} candle(s), newest {}",
            market_id,
            outcome.candles_merged,
            newest.map(epoch_sec_to_utc).unwrap_or_else(|| "-".to_string())
        );
        outcome
    }

    async fn fetch(&self, market_id: &str) -> Result<Vec<RawCandle>, PipelineError> {
        let request = self
            .provider
            .fetch_candles(market_id, self.resolution, self.fetch_limit);
        match timeout(self.fetch_timeout, request).await {
            Ok(Ok(candles)) => Ok(candles),
            Ok(Err(e)) => Err(PipelineError::transport(&e)),
            Err(_) => Err(PipelineError::Timeout(self.fetch_timeout)),
        }
    }

    async fn fail(
        &self,
        market_id: &str,
        mut outcome: IngestOutcome,
        error: PipelineError,
    ) -> IngestOutcome {
        log::warn!("{}: ingest failed: {}", market_id, error);
        if let Err(e) = self
            .status
            .record_ingest_failure(market_id, &error.to_string())
            .await
        {
            log::error!("{}: could not record ingest failure: {:#}", market_id, e);
        }
        outcome.error = Some(error);
        outcome
    }
}
