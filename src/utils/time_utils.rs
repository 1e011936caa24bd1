use chrono::{DateTime, Utc};

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const S_IN_MIN: i64 = 60;
    pub const S_IN_3_MIN: i64 = Self::S_IN_MIN * 3;
    pub const S_IN_5_MIN: i64 = Self::S_IN_MIN * 5;
    pub const S_IN_15_MIN: i64 = Self::S_IN_MIN * 15;
    pub const S_IN_30_MIN: i64 = Self::S_IN_MIN * 30;
    pub const S_IN_H: i64 = Self::S_IN_MIN * 60;
    pub const S_IN_2_H: i64 = Self::S_IN_H * 2;
    pub const S_IN_4_H: i64 = Self::S_IN_H * 4;
    pub const S_IN_6_H: i64 = Self::S_IN_H * 6;
    pub const S_IN_8_H: i64 = Self::S_IN_H * 8;
    pub const S_IN_12_H: i64 = Self::S_IN_H * 12;
    pub const S_IN_D: i64 = Self::S_IN_H * 24;
    pub const S_IN_3_D: i64 = Self::S_IN_D * 3;
    pub const S_IN_W: i64 = Self::S_IN_D * 7;
    pub const S_IN_YEAR: i64 = Self::S_IN_D * 365;
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Binance-style shorthand (e.g. `30m`, `1h`) for a resolution in seconds.
    pub fn resolution_to_string(secs: i64) -> Option<&'static str> {
        let label = match secs {
            Self::S_IN_MIN => "1m",
            Self::S_IN_3_MIN => "3m",
            Self::S_IN_5_MIN => "5m",
            Self::S_IN_15_MIN => "15m",
            Self::S_IN_30_MIN => "30m",
            Self::S_IN_H => "1h",
            Self::S_IN_2_H => "2h",
            Self::S_IN_4_H => "4h",
            Self::S_IN_6_H => "6h",
            Self::S_IN_8_H => "8h",
            Self::S_IN_12_H => "12h",
            Self::S_IN_D => "1d",
            Self::S_IN_3_D => "3d",
            Self::S_IN_W => "1w",
            _ => return None,
        };
        Some(label)
    }
}

// Time Helper functions

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

pub fn epoch_sec_to_utc(epoch_sec: i64) -> String {
    // Used for display purposes
    match DateTime::from_timestamp(epoch_sec, 0) {
        Some(dt) => format!("{}", dt.format(TimeUtils::STANDARD_TIME_FORMAT)),
        None => format!("<invalid ts {}>", epoch_sec),
    }
}

pub fn format_duration(ms: i64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }
    format!("{}d", hours / 24)
}
