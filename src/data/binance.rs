//! Binance spot REST implementation of `MarketDataProvider`.

use {
    anyhow::Result,
    async_trait::async_trait,
    binance_sdk::{
        config::ConfigurationRestApi,
        errors::{self, ConnectorError as connection_error},
        spot::{
            SpotRestApi,
            rest_api::{
                KlinesIntervalEnum, KlinesItemInner, KlinesParams, RestApi, TickerPriceParams,
                TickerPriceResponse,
            },
        },
    },
    std::{convert::TryFrom, error::Error, fmt},
};

use crate::{
    config::BINANCE,
    data::{
        GlobalRateLimiter,
        provider::{MarketDataProvider, RawCandle, TimestampUnit},
    },
    domain::Resolution,
    utils::TimeUtils,
};

pub fn try_interval_from_secs(secs: i64) -> Result<KlinesIntervalEnum, BinanceError> {
    use TimeUtils as T;
    match secs {
        1 => Ok(KlinesIntervalEnum::Interval1s),
        T::S_IN_MIN => Ok(KlinesIntervalEnum::Interval1m),
        T::S_IN_3_MIN => Ok(KlinesIntervalEnum::Interval3m),
        T::S_IN_5_MIN => Ok(KlinesIntervalEnum::Interval5m),
        T::S_IN_15_MIN => Ok(KlinesIntervalEnum::Interval15m),
        T::S_IN_30_MIN => Ok(KlinesIntervalEnum::Interval30m),
        T::S_IN_H => Ok(KlinesIntervalEnum::Interval1h),
        T::S_IN_2_H => Ok(KlinesIntervalEnum::Interval2h),
        T::S_IN_4_H => Ok(KlinesIntervalEnum::Interval4h),
        T::S_IN_6_H => Ok(KlinesIntervalEnum::Interval6h),
        T::S_IN_8_H => Ok(KlinesIntervalEnum::Interval8h),
        T::S_IN_12_H => Ok(KlinesIntervalEnum::Interval12h),
        T::S_IN_D => Ok(KlinesIntervalEnum::Interval1d),
        T::S_IN_3_D => Ok(KlinesIntervalEnum::Interval3d),
        T::S_IN_W => Ok(KlinesIntervalEnum::Interval1w),
        _ => Err(BinanceError::UnsupportedResolution(secs)),
    }
}

#[derive(Debug)]
pub enum BinanceError {
    InvalidLength,
    InvalidType(String),
    UnsupportedResolution(i64),
    ConnectionFailed(String),
}

impl fmt::Display for BinanceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> std::fmt::Result {
        match self {
            BinanceError::InvalidLength => write!(f, "Invalid kline length"),
            BinanceError::InvalidType(field) => write!(f, "Invalid kline field type: {}", field),
            BinanceError::UnsupportedResolution(secs) => {
                write!(f, "Unsupported Binance kline resolution: {}s", secs)
            }
            BinanceError::ConnectionFailed(msg) => {
                write!(f, "Binance API connection failed: {}.", msg)
            }
        }
    }
}

impl Error for BinanceError {}

// Unparseable numbers become NaN so the coordinator can report the record as skipped.
fn kline_item_to_f64(item: Option<KlinesItemInner>) -> f64 {
    match item {
        Some(KlinesItemInner::String(s)) => s.parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// One kline row: `[open_time_ms, open, high, low, close, volume, close_time, ...]`.
pub struct BinanceKline(pub RawCandle);

impl TryFrom<Vec<KlinesItemInner>> for BinanceKline {
    type Error = BinanceError;

    fn try_from(row: Vec<KlinesItemInner>) -> Result<Self, Self::Error> {
        let mut items = row.into_iter();
        let open_timestamp_ms = match items.next().ok_or(BinanceError::InvalidLength)? {
            KlinesItemInner::Integer(a) => a,
            _ => return Err(BinanceError::InvalidType("open_time".to_string())),
        };

        let open = kline_item_to_f64(items.next());
        let high = kline_item_to_f64(items.next());
        let low = kline_item_to_f64(items.next());
        let close = kline_item_to_f64(items.next());
        let volume = kline_item_to_f64(items.next());

        Ok(BinanceKline(RawCandle {
            timestamp: open_timestamp_ms,
            open,
            high,
            low,
            close,
            volume,
        }))
    }
}

fn configure_binance_client() -> Result<RestApi> {
    let client = &BINANCE.client;
    let rest_conf = ConfigurationRestApi::builder()
        .timeout(client.timeout_ms)
        .retries(client.retries)
        .backoff(client.backoff_ms)
        .build()?;
    Ok(SpotRestApi::production(rest_conf))
}

fn log_connector_error(market_id: &str, e: &anyhow::Error) -> BinanceError {
    if let Some(conn_err) = e.downcast_ref::<errors::ConnectorError>() {
        match conn_err {
            connection_error::TooManyRequestsError(msg) => {
                log::warn!("{} Rate limit exceeded. {}", market_id, msg);
            }
            connection_error::RateLimitBanError(msg) => {
                log::error!("{} IP address banned due to excessive rate limits. {}", market_id, msg);
            }
            errors::ConnectorError::ServerError { msg, status_code } => {
                log::error!("{} Server error: {} (status code: {:?})", market_id, msg, status_code);
            }
            errors::ConnectorError::NetworkError(msg) => {
                log::warn!("{} Network error. {}", market_id, msg);
            }
            other => {
                log::warn!("{} Binance connector error: {:?}", market_id, other);
            }
        }
        BinanceError::ConnectionFailed(conn_err.to_string())
    } else {
        BinanceError::ConnectionFailed(e.to_string())
    }
}

pub struct BinanceProvider {
    limiter: GlobalRateLimiter,
    quote_assets: Vec<String>,
    max_markets: usize,
}

impl BinanceProvider {
    pub fn new(limiter: GlobalRateLimiter) -> Self {
        Self {
            limiter,
            quote_assets: BINANCE
                .discovery
                .quote_assets
                .iter()
                .map(|q| q.to_string())
                .collect(),
            max_markets: BINANCE.discovery.max_markets,
        }
    }

    pub fn with_discovery(mut self, quote_assets: Vec<String>, max_markets: usize) -> Self {
        self.quote_assets = quote_assets;
        self.max_markets = max_markets;
        self
    }

    fn is_tracked_symbol(&self, symbol: &str) -> bool {
        self.quote_assets
            .iter()
            .any(|q| symbol.len() > q.len() && symbol.ends_with(q.as_str()))
    }
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    fn timestamp_unit(&self) -> TimestampUnit {
        TimestampUnit::Milliseconds
    }

    async fn list_markets(&self) -> Result<Vec<String>> {
        self.limiter
            .acquire(BINANCE.limits.ticker_price_call_weight, "list_markets")
            .await;

        let client = configure_binance_client()?;
        let params = TickerPriceParams {
            symbol: None,
            symbols: None,
            symbol_status: None,
        };
        let response = client
            .ticker_price(params)
            .await
            .map_err(|e| log_connector_error("list_markets", &e))?;

        let mut markets: Vec<String> = match response.data().await? {
            TickerPriceResponse::TickerPriceResponse2(all_tickers) => all_tickers
                .into_iter()
                .filter_map(|t| t.symbol)
                .filter(|s| self.is_tracked_symbol(s))
                .collect(),
            _ => {
                return Err(BinanceError::InvalidType("ticker_price response".to_string()).into());
            }
        };

        markets.sort();
        markets.dedup();
        markets.truncate(self.max_markets);
        Ok(markets)
    }

    async fn fetch_candles(
        &self,
        market_id: &str,
        resolution: Resolution,
        limit: u32,
    ) -> Result<Vec<RawCandle>> {
        let interval = try_interval_from_secs(i64::from(resolution.secs()))?;
        let limit = limit.min(BINANCE.limits.klines_limit) as i32;

        self.limiter
            .acquire(BINANCE.limits.kline_call_weight, market_id)
            .await;

        let client = configure_binance_client()?;
        let params = KlinesParams::builder(market_id.to_string(), interval)
            .limit(limit)
            .build()?;

        let response = client
            .klines(params)
            .await
            .map_err(|e| log_connector_error(market_id, &e))?;
        let rows = response.data().await?;

        let candles = rows
            .into_iter()
            .map(|row| BinanceKline::try_from(row).map(|k| k.0))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Fetched {} klines for {}", candles.len(), market_id);
        Ok(candles)
    }
}
