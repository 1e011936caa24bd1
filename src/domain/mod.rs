// Domain types and value objects
mod candle;
mod resolution;
mod snapshot;

// Re-export commonly used types to the world
pub use candle::Candle;
pub use resolution::Resolution;
pub use snapshot::{IngestStatus, MetricsSnapshot};
