// PostgreSQL AppStateRepository

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::AppStateRecord;
use devdash_core::error::Result;
use devdash_core::port::AppStateRepository;
use sqlx::PgPool;

pub struct PgAppStateRepository {
    pool: PgPool,
}

impl PgAppStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StateRow {
    key: String,
    value: serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl From<StateRow> for AppStateRecord {
    fn from(row: StateRow) -> Self {
        AppStateRecord {
            key: row.key,
            value: row.value,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl AppStateRepository for PgAppStateRepository {
    async fn get(&self, key: &str) -> Result<Option<AppStateRecord>> {
        let row: Option<StateRow> =
            sqlx::query_as("SELECT key, value, updated_at FROM app_state WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(AppStateRecord::from))
    }

    async fn set(&self, key: &str, value: &serde_json::Value, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO app_state (key, value, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM app_state WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<AppStateRecord>> {
        let rows: Vec<StateRow> = sqlx::query_as(
            "SELECT key, value, updated_at FROM app_state \
             WHERE starts_with(key, $1) ORDER BY key COLLATE \"C\"",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(AppStateRecord::from).collect())
    }
}
