// PostgreSQL ToolConfigRepository

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::{Tool, ToolConfigRecord};
use devdash_core::error::Result;
use devdash_core::port::ToolConfigRepository;
use sqlx::PgPool;
use tracing::warn;

pub struct PgToolConfigRepository {
    pool: PgPool,
}

impl PgToolConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ToolConfigRow {
    tool: String,
    enabled: bool,
    settings: serde_json::Value,
    updated_at: DateTime<Utc>,
}

impl ToolConfigRow {
    fn into_record(self, tool: Tool) -> ToolConfigRecord {
        ToolConfigRecord {
            tool,
            enabled: self.enabled,
            settings: self.settings,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
impl ToolConfigRepository for PgToolConfigRepository {
    async fn upsert(&self, record: &ToolConfigRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tool_configs (tool, enabled, settings, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tool) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                settings = EXCLUDED.settings,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.tool.as_str())
        .bind(record.enabled)
        .bind(&record.settings)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get(&self, tool: Tool) -> Result<Option<ToolConfigRecord>> {
        let row: Option<ToolConfigRow> = sqlx::query_as(
            "SELECT tool, enabled, settings, updated_at FROM tool_configs WHERE tool = $1",
        )
        .bind(tool.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_record(tool)))
    }

    async fn list(&self) -> Result<Vec<ToolConfigRecord>> {
        let rows: Vec<ToolConfigRow> = sqlx::query_as(
            "SELECT tool, enabled, settings, updated_at FROM tool_configs ORDER BY tool COLLATE \"C\"",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.tool.parse::<Tool>() {
                Ok(tool) => Some(row.into_record(tool)),
                Err(e) => {
                    warn!(tool = %row.tool, error = %e, "Skipping config for unknown tool");
                    None
                }
            })
            .collect())
    }

    async fn set_enabled(&self, tool: Tool, enabled: bool, now: DateTime<Utc>) -> Result<bool> {
        let result =
            sqlx::query("UPDATE tool_configs SET enabled = $1, updated_at = $2 WHERE tool = $3")
                .bind(enabled)
                .bind(now)
                .bind(tool.as_str())
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
