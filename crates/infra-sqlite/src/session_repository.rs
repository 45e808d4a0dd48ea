// SQLite SessionRepository

use crate::codec::{lenient_json, map_insert_error, map_sqlx_error, require_millis, to_millis};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::SessionRecord;
use devdash_core::error::Result;
use devdash_core::port::SessionRepository;
use sqlx::SqlitePool;

pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    data: String,
    expires_at: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SessionRow> for SessionRecord {
    type Error = devdash_core::AppError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(SessionRecord {
            data: lenient_json(&row.id, "data", Some(row.data.as_str()))
                .unwrap_or_else(|| serde_json::json!({})),
            expires_at: require_millis("expires_at", row.expires_at)?,
            created_at: require_millis("created_at", row.created_at)?,
            updated_at: require_millis("updated_at", row.updated_at)?,
            id: row.id,
            user_id: row.user_id,
        })
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, record: &SessionRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, data, expires_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(record.data.to_string())
        .bind(to_millis(record.expires_at))
        .bind(to_millis(record.created_at))
        .bind(to_millis(record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(map_insert_error(&record.id))?;
        Ok(())
    }

    async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<SessionRecord>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, user_id, data, expires_at, created_at, updated_at \
             FROM sessions WHERE id = ? AND expires_at > ?",
        )
        .bind(id)
        .bind(to_millis(now))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(SessionRecord::try_from).transpose()
    }

    async fn touch(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET expires_at = ?, updated_at = ? WHERE id = ? AND expires_at > ?",
        )
        .bind(to_millis(expires_at))
        .bind(to_millis(now))
        .bind(id)
        .bind(to_millis(now))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(to_millis(now))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
