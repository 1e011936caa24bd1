use std::sync::Arc;

use super::messages::{ComputeOutcome, PipelineError};
use crate::analysis::compute_snapshot;
use crate::config::IndicatorSettings;
use crate::data::{MarketDataStorage, MetricsRepositoryTrait};
use crate::domain::Resolution;

/// Reads the latest candle window for a market and materializes one metrics row.
pub struct ComputationEngine {
    candles: Arc<dyn MarketDataStorage>,
    metrics: Arc<dyn MetricsRepositoryTrait>,
    resolution: Resolution,
    lookback: u32,
    min_candles: usize,
    settings: IndicatorSettings,
}

impl ComputationEngine {
    pub fn new(
        candles: Arc<dyn MarketDataStorage>,
        metrics: Arc<dyn MetricsRepositoryTrait>,
        resolution: Resolution,
        lookback: u32,
        min_candles: usize,
        settings: IndicatorSettings,
    ) -> Self {
        Self {
            candles,
            metrics,
            resolution,
            lookback,
            min_candles,
            settings,
        }
    }

    pub async fn compute(&self, market_id: &str) -> Result<ComputeOutcome, PipelineError> {
        let window = self
            .candles
            .recent_candles(market_id, self.resolution, self.lookback)
            .await
            .map_err(|e| PipelineError::storage(&e))?;

        if window.len() < self.min_candles {
            log::debug!(
                "{}: insufficient data ({} of {} candles)",
                market_id,
                window.len(),
                self.min_candles
            );
            return Ok(ComputeOutcome::InsufficientData {
                available: window.len(),
                required: self.min_candles,
            });
        }

        let snapshot = crate::trace_time!(format!("compute {}", market_id), 250, {
            compute_snapshot(market_id, &window, self.resolution, &self.settings)
        });

        let Some(snapshot) = snapshot.filter(|s| s.has_any_value()) else {
            log::warn!("{}: no indicator computable from {} candles", market_id, window.len());
            return Ok(ComputeOutcome::NothingComputable);
        };

        self.metrics
            .upsert_snapshot(&snapshot)
            .await
            .map_err(|e| PipelineError::storage(&e))?;

        Ok(ComputeOutcome::Computed(snapshot))
    }
}
