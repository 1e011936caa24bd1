mod maths_utils;
mod perf;
mod time_utils;

pub use time_utils::{TimeUtils, epoch_sec_to_utc, format_duration, now_utc};

pub(crate) use maths_utils::{duration_to_candles, mean, mean_and_sample_stddev};
