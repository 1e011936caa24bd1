use {
    crate::{
        config::PERSISTENCE,
        domain::{Candle, IngestStatus, Resolution},
    },
    anyhow::{Context, Result},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::{
        ConnectOptions, Pool, Row, Sqlite,
        sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
            SqliteSynchronous,
        },
    },
    std::str::FromStr,
};

/// Deduplicated OHLCV storage keyed by `(market_id, resolution, timestamp)`.
#[async_trait]
pub trait MarketDataStorage: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    /// Insert, or replace `high/low/close/volume` of an existing row. `open` is never overwritten.
    async fn upsert_candle(
        &self,
        market_id: &str,
        resolution: Resolution,
        candle: &Candle,
    ) -> Result<()>;

    /// The newest `limit` candles, ordered oldest to newest.
    async fn recent_candles(
        &self,
        market_id: &str,
        resolution: Resolution,
        limit: u32,
    ) -> Result<Vec<Candle>>;

    async fn last_timestamp(&self, market_id: &str, resolution: Resolution)
    -> Result<Option<i64>>;

    /// Candles with `from <= timestamp <= to`, oldest first.
    async fn candles_in_range(
        &self,
        market_id: &str,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>>;
}

/// Per-market ingestion health. Rows are created on the first attempt and never removed.
#[async_trait]
pub trait IngestStatusStore: Send + Sync {
    async fn ingest_status(&self, market_id: &str) -> Result<Option<IngestStatus>>;

    /// Clears the error state. `last_candle_timestamp` only ever moves forward.
    async fn record_ingest_success(
        &self,
        market_id: &str,
        newest_timestamp: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Bumps the consecutive failure counter; `last_candle_timestamp` is left alone.
    async fn record_ingest_failure(&self, market_id: &str, error: &str) -> Result<()>;
}

/// Opens (creating if needed) a WAL-mode SQLite pool.
pub(crate) async fn connect_pool(db_path: &str, max_connections: u32) -> Result<Pool<Sqlite>> {
    let settings = &PERSISTENCE.sqlite;
    let connection_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(settings.busy_timeout)
        .synchronous(SqliteSynchronous::Normal)
        .log_slow_statements(log::LevelFilter::Warn, settings.slow_statement);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connection_options)
        .await
        .with_context(|| format!("Failed to open SQLite database at {}", db_path))?;

    Ok(pool)
}

pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

impl SqliteStorage {
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = connect_pool(db_path, PERSISTENCE.sqlite.max_connections).await?;
        Ok(Self { pool })
    }

    fn candle_from_row(row: &SqliteRow) -> Candle {
        Candle::new(
            row.get("timestamp"),
            row.get("open"),
            row.get("high"),
            row.get("low"),
            row.get("close"),
            row.get("volume"),
        )
    }
}

#[async_trait]
impl MarketDataStorage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candles (
                market_id TEXT NOT NULL,
                resolution INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (market_id, resolution, timestamp)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create candles table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_candles_market_time ON candles (market_id, timestamp DESC);",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create candles index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ingest_status (
                market_id TEXT PRIMARY KEY,
                last_candle_timestamp INTEGER,
                last_ingested_at INTEGER,
                error_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create ingest_status table")?;

        Ok(())
    }

    async fn upsert_candle(
        &self,
        market_id: &str,
        resolution: Resolution,
        candle: &Candle,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO candles (market_id, resolution, timestamp, open, high, low, close, volume)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (market_id, resolution, timestamp) DO UPDATE SET
                high = excluded.high,
                low = excluded.low,
                close = excluded.close,
                volume = excluded.volume
            "#,
        )
        .bind(market_id)
        .bind(i64::from(resolution.secs()))
        .bind(candle.timestamp)
        .bind(candle.open)
        .bind(candle.high)
        .bind(candle.low)
        .bind(candle.close)
        .bind(candle.volume)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert candle {} @ {}", market_id, candle.timestamp))?;

        Ok(())
    }

    async fn recent_candles(
        &self,
        market_id: &str,
        resolution: Resolution,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, open, high, low, close, volume
            FROM candles
            WHERE market_id = ? AND resolution = ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(market_id)
        .bind(i64::from(resolution.secs()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        // Reverse to chronological order.
        let mut candles: Vec<Candle> = rows.iter().map(Self::candle_from_row).collect();
        candles.reverse();
        Ok(candles)
    }

    async fn last_timestamp(
        &self,
        market_id: &str,
        resolution: Resolution,
    ) -> Result<Option<i64>> {
        let result = sqlx::query(
            r#"
            SELECT MAX(timestamp) as last_time
            FROM candles
            WHERE market_id = ? AND resolution = ?
            "#,
        )
        .bind(market_id)
        .bind(i64::from(resolution.secs()))
        .fetch_one(&self.pool)
        .await?;

        let last_time: Option<i64> = result.try_get("last_time")?;
        Ok(last_time)
    }

    async fn candles_in_range(
        &self,
        market_id: &str,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, open, high, low, close, volume
            FROM candles
            WHERE market_id = ? AND resolution = ? AND timestamp >= ? AND timestamp <= ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(market_id)
        .bind(i64::from(resolution.secs()))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::candle_from_row).collect())
    }
}

#[async_trait]
impl IngestStatusStore for SqliteStorage {
    async fn ingest_status(&self, market_id: &str) -> Result<Option<IngestStatus>> {
        let row = sqlx::query(
            r#"
            SELECT market_id, last_candle_timestamp, last_ingested_at, error_count, last_error
            FROM ingest_status
            WHERE market_id = ?
            "#,
        )
        .bind(market_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let ingested_at: Option<i64> = r.try_get("last_ingested_at")?;
        let error_count: i64 = r.try_get("error_count")?;
        Ok(Some(IngestStatus {
            market_id: r.try_get("market_id")?,
            last_candle_timestamp: r.try_get("last_candle_timestamp")?,
            last_ingested_at: ingested_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            error_count: u32::try_from(error_count).unwrap_or(u32::MAX),
            last_error: r.try_get("last_error")?,
        }))
    }

    async fn record_ingest_success(
        &self,
        market_id: &str,
        newest_timestamp: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        // SQLite's scalar MAX() is NULL if either side is, hence the COALESCE pair.
        sqlx::query(
            r#"
            INSERT INTO ingest_status (market_id, last_candle_timestamp, last_ingested_at, error_count, last_error)
            VALUES (?, ?, ?, 0, NULL)
            ON CONFLICT (market_id) DO UPDATE SET
                last_candle_timestamp = MAX(
                    COALESCE(ingest_status.last_candle_timestamp, excluded.last_candle_timestamp),
                    COALESCE(excluded.last_candle_timestamp, ingest_status.last_candle_timestamp)
                ),
                last_ingested_at = excluded.last_ingested_at,
                error_count = 0,
                last_error = NULL
            "#,
        )
        .bind(market_id)
        .bind(newest_timestamp)
        .bind(at.timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to record ingest success for {}", market_id))?;

        Ok(())
    }

    async fn record_ingest_failure(&self, market_id: &str, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ingest_status (market_id, last_candle_timestamp, last_ingested_at, error_count, last_error)
            VALUES (?, NULL, NULL, 1, ?)
            ON CONFLICT (market_id) DO UPDATE SET
                error_count = ingest_status.error_count + 1,
                last_error = excluded.last_error
            "#,
        )
        .bind(market_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to record ingest failure for {}", market_id))?;

        Ok(())
    }
}
