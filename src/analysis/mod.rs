// Indicator maths and snapshot assembly
pub mod indicators;
pub mod snapshot;

pub use indicators::BollingerBands;
pub use snapshot::{compute_snapshot, volatility_window};
