// PostgreSQL Connection Pool Setup

use crate::error::map_sqlx_error;
use devdash_core::error::{AppError, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Config(format!("invalid postgres url: {}", e)))?
        .application_name("devdash");

    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}
