//! Configuration module for the metrics pipeline.

// Can all be private now because we have a public re-export.
mod binance;
mod persistence;
mod pipeline;

// Re-export commonly used items
pub use binance::BINANCE;
pub use persistence::PERSISTENCE;
pub use pipeline::{INDICATORS, IndicatorSettings, PIPELINE, PipelineConfig};
