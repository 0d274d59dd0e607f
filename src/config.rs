use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

/// Connection settings for the SQLite ledger store.
/// Every field can also come from the environment.
#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// Database file path
    #[arg(short, long, env = "BANKCORE_DATABASE", default_value = "bankcore.db", global = true)]
    pub database: PathBuf,

    /// Maximum number of pooled connections
    #[arg(long, env = "BANKCORE_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    pub max_connections: u32,

    /// How long a write waits for the database write lock (milliseconds)
    #[arg(long, env = "BANKCORE_BUSY_TIMEOUT_MS", default_value_t = 5000, global = true)]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// SQLite options for this config. `create` allows creating a missing file.
    pub fn connect_options(&self, create: bool) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Args)]
pub struct LogConfig {
    /// Log filter (e.g. "info", "bankcore=debug"); RUST_LOG takes precedence
    #[arg(long, env = "BANKCORE_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,
}
