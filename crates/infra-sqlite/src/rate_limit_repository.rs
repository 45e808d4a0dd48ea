// SQLite RateLimitRepository

use crate::codec::{map_sqlx_error, require_millis, to_millis};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::{RateLimitRecord, Tool};
use devdash_core::error::Result;
use devdash_core::port::RateLimitRepository;
use sqlx::SqlitePool;

pub struct SqliteRateLimitRepository {
    pool: SqlitePool,
}

impl SqliteRateLimitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RateLimitRow {
    endpoint: String,
    limit_total: i64,
    remaining: i64,
    reset_at: i64,
    updated_at: i64,
}

impl RateLimitRow {
    fn into_record(self, tool: Tool) -> Result<RateLimitRecord> {
        Ok(RateLimitRecord {
            tool,
            endpoint: self.endpoint,
            limit: self.limit_total,
            remaining: self.remaining,
            reset_at: require_millis("reset_at", self.reset_at)?,
            updated_at: require_millis("updated_at", self.updated_at)?,
        })
    }
}

#[async_trait]
impl RateLimitRepository for SqliteRateLimitRepository {
    async fn upsert(&self, record: &RateLimitRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rate_limits (tool, endpoint, limit_total, remaining, reset_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(tool, endpoint) DO UPDATE SET
                limit_total = excluded.limit_total,
                remaining = excluded.remaining,
                reset_at = excluded.reset_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.tool.as_str())
        .bind(&record.endpoint)
        .bind(record.limit)
        .bind(record.remaining)
        .bind(to_millis(record.reset_at))
        .bind(to_millis(record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get(&self, tool: Tool, endpoint: &str) -> Result<Option<RateLimitRecord>> {
        let row: Option<RateLimitRow> = sqlx::query_as(
            "SELECT endpoint, limit_total, remaining, reset_at, updated_at \
             FROM rate_limits WHERE tool = ? AND endpoint = ?",
        )
        .bind(tool.as_str())
        .bind(endpoint)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.into_record(tool)).transpose()
    }

    async fn list_for_tool(&self, tool: Tool) -> Result<Vec<RateLimitRecord>> {
        let rows: Vec<RateLimitRow> = sqlx::query_as(
            "SELECT endpoint, limit_total, remaining, reset_at, updated_at \
             FROM rate_limits WHERE tool = ? ORDER BY endpoint",
        )
        .bind(tool.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(|r| r.into_record(tool)).collect()
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE reset_at < ?")
            .bind(to_millis(before))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::from_millis;
    use crate::{create_pool, run_migrations};

    async fn setup() -> SqliteRateLimitRepository {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteRateLimitRepository::new(pool)
    }

    fn record(tool: Tool, endpoint: &str, remaining: i64, reset_at: i64) -> RateLimitRecord {
        RateLimitRecord {
            tool,
            endpoint: endpoint.to_string(),
            limit: 5000,
            remaining,
            reset_at: from_millis(reset_at).unwrap(),
            updated_at: from_millis(1_000).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_snapshot() {
        let repo = setup().await;
        repo.upsert(&record(Tool::GitHub, "/search", 30, 10_000))
            .await
            .unwrap();
        repo.upsert(&record(Tool::GitHub, "/search", 29, 10_000))
            .await
            .unwrap();

        let stored = repo.get(Tool::GitHub, "/search").await.unwrap().unwrap();
        assert_eq!(stored.remaining, 29);
        assert!(repo.get(Tool::GitLab, "/search").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_expire() {
        let repo = setup().await;
        repo.upsert(&record(Tool::Jira, "/issues", 0, 2_000)).await.unwrap();
        repo.upsert(&record(Tool::Jira, "", 90, 8_000)).await.unwrap();
        repo.upsert(&record(Tool::GitHub, "", 90, 2_000)).await.unwrap();

        let jira = repo.list_for_tool(Tool::Jira).await.unwrap();
        let endpoints: Vec<&str> = jira.iter().map(|r| r.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["", "/issues"]);

        let deleted = repo.delete_expired(from_millis(5_000).unwrap()).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(repo.list_for_tool(Tool::Jira).await.unwrap().len(), 1);
    }
}
