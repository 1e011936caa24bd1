use std::time::Duration;

use crate::analysis::indicators::{
    average_true_range, bollinger_bands, log_returns, momentum, realized_volatility,
};
use crate::config::IndicatorSettings;
use crate::domain::{Candle, MetricsSnapshot, Resolution};

/// Number of log returns behind a volatility horizon at `resolution`.
///
/// A horizon shorter than one candle has no window at all. A horizon of
/// exactly one candle is widened to two returns, the minimum for a sample
/// standard deviation.
pub fn volatility_window(resolution: Resolution, horizon: Duration) -> Option<usize> {
    match resolution.candles_in(horizon) {
        0 => None,
        n => Some(n.max(2)),
    }
}

/// Computes the full indicator set over `candles` (oldest to newest).
///
/// Returns `None` for an empty window. Otherwise the snapshot is keyed at the
/// newest candle and each field is filled only if its window was satisfiable.
pub fn compute_snapshot(
    market_id: &str,
    candles: &[Candle],
    resolution: Resolution,
    settings: &IndicatorSettings,
) -> Option<MetricsSnapshot> {
    let newest = candles.last()?;
    let mut snapshot = MetricsSnapshot::empty(market_id, newest.timestamp);

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let returns = log_returns(&closes);
    let annualization = resolution.candles_per_year();

    let [h1, h4, h24] = IndicatorSettings::VOLATILITY_HORIZONS.map(|h| {
        volatility_window(resolution, h)
            .and_then(|w| realized_volatility(&returns, w, annualization))
    });
    snapshot.volatility_1h = h1;
    snapshot.volatility_4h = h4;
    snapshot.volatility_24h = h24;

    if let Some(bands) = bollinger_bands(&closes, settings.bollinger_window, settings.bollinger_k) {
        snapshot.bollinger_upper = Some(bands.upper);
        snapshot.bollinger_middle = Some(bands.middle);
        snapshot.bollinger_lower = Some(bands.lower);
    }

    snapshot.atr = average_true_range(candles, settings.atr_window);
    snapshot.momentum = momentum(&closes, settings.momentum_window);

    Some(snapshot)
}
