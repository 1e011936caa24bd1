use {
    crate::utils::TimeUtils,
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

/// Candle duration in seconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Resolution(u32);

impl Resolution {
    pub const H1: Self = Self(3600);

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    #[inline]
    pub fn secs(self) -> u32 {
        self.0
    }

    /// Number of candles of this resolution in a 365-day year.
    pub fn candles_per_year(self) -> f64 {
        TimeUtils::S_IN_YEAR as f64 / self.0 as f64
    }

    /// How many whole candles fit in `duration`.
    pub fn candles_in(self, duration: Duration) -> usize {
        crate::utils::duration_to_candles(duration, i64::from(self.0))
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match TimeUtils::resolution_to_string(i64::from(self.0)) {
            Some(label) => write!(f, "{}", label),
            None => write!(f, "{}s", self.0),
        }
    }
}
