use std::{error::Error, fmt, time::Duration};

use strum_macros::Display;

use crate::domain::MetricsSnapshot;

/// Failure of one market's work within a cycle. Never crosses market boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The upstream fetch failed (network, HTTP, or parse).
    Transport(String),
    /// The upstream fetch did not answer within the configured timeout.
    Timeout(Duration),
    /// A read or write against the candle, status, or metrics store failed.
    Storage(String),
}

impl PipelineError {
    pub(crate) fn transport(e: &anyhow::Error) -> Self {
        PipelineError::Transport(format!("{:#}", e))
    }

    pub(crate) fn storage(e: &anyhow::Error) -> Self {
        PipelineError::Storage(format!("{:#}", e))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, PipelineError::Transport(_) | PipelineError::Timeout(_))
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::Transport(msg) => write!(f, "transport error: {}", msg),
            PipelineError::Timeout(d) => write!(f, "fetch timed out after {:.1}s", d.as_secs_f64()),
            PipelineError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl Error for PipelineError {}

/// Why an upstream record was not merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SkipReason {
    #[strum(to_string = "non-finite price or volume")]
    NonFiniteValue,
    #[strum(to_string = "non-positive timestamp")]
    NonPositiveTimestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCandle {
    /// Timestamp after normalization to seconds.
    pub timestamp: i64,
    pub reason: SkipReason,
}

/// Result of one `ingest` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngestOutcome {
    pub candles_merged: usize,
    pub skipped: Vec<SkippedCandle>,
    pub error: Option<PipelineError>,
}

impl IngestOutcome {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of one `compute` call that did not fail on storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeOutcome {
    /// A snapshot was computed and written.
    Computed(MetricsSnapshot),
    /// Fewer candles than the minimum threshold; nothing written.
    InsufficientData { available: usize, required: usize },
    /// Enough candles, but every indicator came out null; nothing written.
    NothingComputable,
    /// Skipped because the ingest for this market hit a storage failure.
    NotAttempted,
}

/// Everything one worker did for one market in a cycle.
#[derive(Debug, Clone)]
pub struct MarketReport {
    pub market_id: String,
    pub ingest: IngestOutcome,
    pub compute: Result<ComputeOutcome, PipelineError>,
}

impl MarketReport {
    pub fn success(&self) -> bool {
        self.ingest.success() && self.compute.is_ok()
    }

    pub fn snapshot_written(&self) -> bool {
        matches!(self.compute, Ok(ComputeOutcome::Computed(_)))
    }
}

/// Aggregate of one cycle over the tracked market set.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub markets: Vec<MarketReport>,
    /// Markets never dispatched because of shutdown or the cycle deadline.
    pub not_dispatched: usize,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn total(&self) -> usize {
        self.markets.len() + self.not_dispatched
    }

    pub fn successes(&self) -> usize {
        self.markets.iter().filter(|m| m.success()).count()
    }

    pub fn failures(&self) -> usize {
        self.markets.len() - self.successes()
    }

    pub fn candles_merged(&self) -> usize {
        self.markets.iter().map(|m| m.ingest.candles_merged).sum()
    }

    pub fn candles_skipped(&self) -> usize {
        self.markets.iter().map(|m| m.ingest.skipped.len()).sum()
    }

    pub fn snapshots_written(&self) -> usize {
        self.markets.iter().filter(|m| m.snapshot_written()).count()
    }

    pub fn insufficient(&self) -> usize {
        self.markets
            .iter()
            .filter(|m| matches!(m.compute, Ok(ComputeOutcome::InsufficientData { .. })))
            .count()
    }

    pub fn report(&self, market_id: &str) -> Option<&MarketReport> {
        self.markets.iter().find(|m| m.market_id == market_id)
    }

    pub fn log_summary(&self) {
        log::info!(
            "Cycle complete in {:.1}s: {}/{} markets ok, {} candles merged ({} skipped), {} snapshots written, {} insufficient, {} not dispatched",
            self.elapsed.as_secs_f64(),
            self.successes(),
            self.total(),
            self.candles_merged(),
            self.candles_skipped(),
            self.snapshots_written(),
            self.insufficient(),
            self.not_dispatched
        );
        for m in self.markets.iter().filter(|m| !m.success()) {
            if let Some(e) = &m.ingest.error {
                log::warn!("  {} ingest failed: {}", m.market_id, e);
            }
            if let Err(e) = &m.compute {
                log::warn!("  {} compute failed: {}", m.market_id, e);
            }
        }
    }
}
