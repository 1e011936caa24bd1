use {
    crate::{config::PERSISTENCE, data::storage::connect_pool, domain::MetricsSnapshot},
    anyhow::{Context, Result},
    sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow},
};

// --- TRAIT DEFINITION ---

/// Storage for computed indicator rows, one per `(market_id, timestamp)`.
///
/// The write side is used by the computation engine; the read side is the
/// schema contract for whatever serves metrics to clients.
#[async_trait::async_trait]
pub trait MetricsRepositoryTrait: Send + Sync {
    async fn initialize(&self) -> Result<()>;

    /// Insert, or replace every indicator column of the existing row.
    async fn upsert_snapshot(&self, snapshot: &MetricsSnapshot) -> Result<()>;

    async fn latest_snapshot(&self, market_id: &str) -> Result<Option<MetricsSnapshot>>;

    /// Rows with `timestamp > since`, newest first.
    async fn snapshot_history(&self, market_id: &str, since: i64) -> Result<Vec<MetricsSnapshot>>;

    /// The newest row of every market that has one.
    async fn latest_snapshots(&self) -> Result<Vec<MetricsSnapshot>>;

    async fn market_count(&self) -> Result<u64>;

    async fn newest_timestamp(&self) -> Result<Option<i64>>;
}

// --- SQLITE IMPLEMENTATION ---

pub struct SqliteMetricsRepository {
    pool: Pool<Sqlite>,
}

const SNAPSHOT_COLUMNS: &str = "market_id, timestamp, volatility_1h, volatility_4h, volatility_24h, \
     bollinger_upper, bollinger_middle, bollinger_lower, atr, momentum";

impl SqliteMetricsRepository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = connect_pool(db_path, PERSISTENCE.sqlite.max_connections)
            .await
            .context("Failed to connect to metrics database")?;
        Ok(Self { pool })
    }

    fn snapshot_from_row(row: &SqliteRow) -> Result<MetricsSnapshot> {
        Ok(MetricsSnapshot {
            market_id: row.try_get("market_id")?,
            timestamp: row.try_get("timestamp")?,
            volatility_1h: row.try_get("volatility_1h")?,
            volatility_4h: row.try_get("volatility_4h")?,
            volatility_24h: row.try_get("volatility_24h")?,
            bollinger_upper: row.try_get("bollinger_upper")?,
            bollinger_middle: row.try_get("bollinger_middle")?,
            bollinger_lower: row.try_get("bollinger_lower")?,
            atr: row.try_get("atr")?,
            momentum: row.try_get("momentum")?,
        })
    }
}

#[async_trait::async_trait]
impl MetricsRepositoryTrait for SqliteMetricsRepository {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS volatility_metrics (
                market_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                volatility_1h REAL,
                volatility_4h REAL,
                volatility_24h REAL,
                bollinger_upper REAL,
                bollinger_middle REAL,
                bollinger_lower REAL,
                atr REAL,
                momentum REAL,
                PRIMARY KEY (market_id, timestamp)
            );",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create volatility_metrics table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_metrics_market_time
             ON volatility_metrics (market_id, timestamp DESC);",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create volatility_metrics index")?;

        Ok(())
    }

    async fn upsert_snapshot(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        log::debug!(
            "METRICS DB: storing snapshot for {} @ {}",
            snapshot.market_id,
            snapshot.timestamp
        );

        sqlx::query(
            r#"
            INSERT INTO volatility_metrics
            (market_id, timestamp, volatility_1h, volatility_4h, volatility_24h,
             bollinger_upper, bollinger_middle, bollinger_lower, atr, momentum)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (market_id, timestamp) DO UPDATE SET
                volatility_1h = excluded.volatility_1h,
                volatility_4h = excluded.volatility_4h,
                volatility_24h = excluded.volatility_24h,
                bollinger_upper = excluded.bollinger_upper,
                bollinger_middle = excluded.bollinger_middle,
                bollinger_lower = excluded.bollinger_lower,
                atr = excluded.atr,
                momentum = excluded.momentum
            "#,
        )
        .bind(&snapshot.market_id)
        .bind(snapshot.timestamp)
        .bind(snapshot.volatility_1h)
        .bind(snapshot.volatility_4h)
        .bind(snapshot.volatility_24h)
        .bind(snapshot.bollinger_upper)
        .bind(snapshot.bollinger_middle)
        .bind(snapshot.bollinger_lower)
        .bind(snapshot.atr)
        .bind(snapshot.momentum)
        .execute(&self.pool)
        .await
        .context("Failed to upsert metrics snapshot")?;

        Ok(())
    }

    async fn latest_snapshot(&self, market_id: &str) -> Result<Option<MetricsSnapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM volatility_metrics WHERE market_id = ? ORDER BY timestamp DESC LIMIT 1",
            SNAPSHOT_COLUMNS
        ))
        .bind(market_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::snapshot_from_row).transpose()
    }

    async fn snapshot_history(&self, market_id: &str, since: i64) -> Result<Vec<MetricsSnapshot>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM volatility_metrics WHERE market_id = ? AND timestamp > ? ORDER BY timestamp DESC",
            SNAPSHOT_COLUMNS
        ))
        .bind(market_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::snapshot_from_row).collect()
    }

    async fn latest_snapshots(&self) -> Result<Vec<MetricsSnapshot>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM volatility_metrics m
            WHERE m.timestamp = (
                SELECT MAX(timestamp) FROM volatility_metrics WHERE market_id = m.market_id
            )
            ORDER BY m.market_id
            "#,
            SNAPSHOT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::snapshot_from_row).collect()
    }

    async fn market_count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(DISTINCT market_id) AS n FROM volatility_metrics")
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }

    async fn newest_timestamp(&self) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT MAX(timestamp) AS newest FROM volatility_metrics")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("newest")?)
    }
}
