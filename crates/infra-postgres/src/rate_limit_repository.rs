// PostgreSQL RateLimitRepository

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::{RateLimitRecord, Tool};
use devdash_core::error::Result;
use devdash_core::port::RateLimitRepository;
use sqlx::PgPool;

pub struct PgRateLimitRepository {
    pool: PgPool,
}

impl PgRateLimitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RateLimitRow {
    endpoint: String,
    limit_total: i64,
    remaining: i64,
    reset_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RateLimitRow {
    fn into_record(self, tool: Tool) -> RateLimitRecord {
        RateLimitRecord {
            tool,
            endpoint: self.endpoint,
            limit: self.limit_total,
            remaining: self.remaining,
            reset_at: self.reset_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
impl RateLimitRepository for PgRateLimitRepository {
    async fn upsert(&self, record: &RateLimitRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rate_limits (tool, endpoint, limit_total, remaining, reset_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tool, endpoint) DO UPDATE SET
                limit_total = EXCLUDED.limit_total,
                remaining = EXCLUDED.remaining,
                reset_at = EXCLUDED.reset_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.tool.as_str())
        .bind(&record.endpoint)
        .bind(record.limit)
        .bind(record.remaining)
        .bind(record.reset_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get(&self, tool: Tool, endpoint: &str) -> Result<Option<RateLimitRecord>> {
        let row: Option<RateLimitRow> = sqlx::query_as(
            "SELECT endpoint, limit_total, remaining, reset_at, updated_at \
             FROM rate_limits WHERE tool = $1 AND endpoint = $2",
        )
        .bind(tool.as_str())
        .bind(endpoint)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_record(tool)))
    }

    async fn list_for_tool(&self, tool: Tool) -> Result<Vec<RateLimitRecord>> {
        let rows: Vec<RateLimitRow> = sqlx::query_as(
            "SELECT endpoint, limit_total, remaining, reset_at, updated_at \
             FROM rate_limits WHERE tool = $1 ORDER BY endpoint COLLATE \"C\"",
        )
        .bind(tool.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|r| r.into_record(tool)).collect())
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE reset_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
