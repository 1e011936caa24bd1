//! SQLite persistence configuration
use std::time::Duration;

/// Connection settings shared by the candle and metrics stores
pub struct SqliteSettings {
    /// Default database file (both stores live in the same file)
    pub db_path: &'static str,
    /// Max pooled connections per store
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
    /// Statements slower than this are logged at warn
    pub slow_statement: Duration,
}

pub struct PersistenceConfig {
    pub sqlite: SqliteSettings,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    sqlite: SqliteSettings {
        db_path: "volmetrics.sqlite",
        max_connections: 5,
        busy_timeout: Duration::from_secs(30),
        slow_statement: Duration::from_secs(10),
    },
};
