//! Binance spot REST settings used by the market data adapter.

/// REST constraints: max klines per call, weight budget and call costs.
pub struct RestLimits {
    pub klines_limit: u32,
    pub weight_limit_minute: u32,
    pub kline_call_weight: u32,
    pub ticker_price_call_weight: u32,
}

/// Passed straight to the SDK's `ConfigurationRestApi` builder.
pub struct ClientDefaults {
    pub timeout_ms: u64,
    // Zero: a failed fetch is retried by the next cycle, never inside one.
    pub retries: u32,
    pub backoff_ms: u64,
}

pub struct DiscoveryDefaults {
    /// Quote assets a discovered symbol must end with to be tracked.
    pub quote_assets: &'static [&'static str],
    pub max_markets: usize,
}

pub struct BinanceConfig {
    pub limits: RestLimits,
    pub client: ClientDefaults,
    pub discovery: DiscoveryDefaults,
}

pub const BINANCE: BinanceConfig = BinanceConfig {
    limits: RestLimits {
        klines_limit: 1000,
        weight_limit_minute: 6000,
        kline_call_weight: 2,
        ticker_price_call_weight: 4,
    },
    client: ClientDefaults {
        timeout_ms: 10_000,
        retries: 0,
        backoff_ms: 0,
    },
    discovery: DiscoveryDefaults {
        quote_assets: &["USDT", "USDC"],
        max_markets: 20,
    },
};
