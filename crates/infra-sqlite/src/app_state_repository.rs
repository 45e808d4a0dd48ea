// SQLite AppStateRepository

use crate::codec::{lenient_json, map_sqlx_error, require_millis, to_millis};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::AppStateRecord;
use devdash_core::error::Result;
use devdash_core::port::AppStateRepository;
use sqlx::SqlitePool;
use tracing::warn;

pub struct SqliteAppStateRepository {
    pool: SqlitePool,
}

impl SqliteAppStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StateRow {
    key: String,
    value: String,
    updated_at: i64,
}

impl StateRow {
    /// `None` when the value column does not parse
    fn value(&self) -> Option<serde_json::Value> {
        lenient_json(&self.key, "value", Some(self.value.as_str()))
    }

    fn into_record(self, value: serde_json::Value) -> Result<AppStateRecord> {
        Ok(AppStateRecord {
            value,
            updated_at: require_millis("updated_at", self.updated_at)?,
            key: self.key,
        })
    }
}

#[async_trait]
impl AppStateRepository for SqliteAppStateRepository {
    async fn get(&self, key: &str) -> Result<Option<AppStateRecord>> {
        let row: Option<StateRow> =
            sqlx::query_as("SELECT key, value, updated_at FROM app_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(|r| {
            let value = r.value().unwrap_or(serde_json::Value::Null);
            r.into_record(value)
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: &serde_json::Value, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO app_state (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value.to_string())
        .bind(to_millis(now))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM app_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<AppStateRecord>> {
        // substr() instead of LIKE so '%' and '_' in the prefix match literally
        let rows: Vec<StateRow> = sqlx::query_as(
            "SELECT key, value, updated_at FROM app_state WHERE substr(key, 1, ?) = ? ORDER BY key",
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(value) = row.value() else {
                warn!(key = %row.key, "Skipping state entry with unparsable value");
                continue;
            };
            records.push(row.into_record(value)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::from_millis;
    use crate::{create_pool, run_migrations};
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_list_delete() {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = SqliteAppStateRepository::new(pool);
        let now = from_millis(1_000).unwrap();

        repo.set("sync.github.cursor", &json!("abc"), now).await.unwrap();
        repo.set("sync.jira.cursor", &json!({"page": 3}), now).await.unwrap();
        repo.set("sync_%", &json!(true), now).await.unwrap();
        repo.set("ui.sidebar", &json!(false), now).await.unwrap();

        repo.set("sync.github.cursor", &json!("def"), now).await.unwrap();
        let cursor = repo.get("sync.github.cursor").await.unwrap().unwrap();
        assert_eq!(cursor.value, json!("def"));

        let keys: Vec<String> = repo
            .list("sync.")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["sync.github.cursor", "sync.jira.cursor"]);
        assert_eq!(repo.list("").await.unwrap().len(), 4);

        assert!(repo.delete("ui.sidebar").await.unwrap());
        assert!(repo.get("ui.sidebar").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_value_is_skipped_in_listing() {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = SqliteAppStateRepository::new(pool.clone());
        let now = from_millis(1_000).unwrap();

        repo.set("sync.github.cursor", &json!("abc"), now).await.unwrap();
        repo.set("sync.jira.cursor", &json!("xyz"), now).await.unwrap();
        sqlx::query("UPDATE app_state SET value = '{\"page\":' WHERE key = 'sync.jira.cursor'")
            .execute(&pool)
            .await
            .unwrap();

        let listed = repo.list("sync.").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "sync.github.cursor");

        let jira = repo.get("sync.jira.cursor").await.unwrap().unwrap();
        assert_eq!(jira.value, serde_json::Value::Null);
    }
}
