// SQLite Connection Pool Setup

use crate::codec::map_sqlx_error;
use devdash_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Create SQLite connection pool with WAL mode
///
/// `sqlite::memory:` gets a private shared-cache database, so every
/// connection in the pool sees the same tables.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    if !database_url.starts_with("sqlite:") {
        let scheme = database_url.split(':').next().unwrap_or_default();
        return Err(AppError::Config(format!(
            "invalid sqlite url: unsupported scheme `{}`",
            scheme
        )));
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Config(format!("invalid sqlite url: {}", e)))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}
