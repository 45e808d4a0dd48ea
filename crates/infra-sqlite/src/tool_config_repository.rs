// SQLite ToolConfigRepository

use crate::codec::{lenient_json, map_sqlx_error, require_millis, to_millis};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::{Tool, ToolConfigRecord};
use devdash_core::error::Result;
use devdash_core::port::ToolConfigRepository;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::warn;

pub struct SqliteToolConfigRepository {
    pool: SqlitePool,
}

impl SqliteToolConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ToolConfigRow {
    tool: String,
    enabled: bool,
    settings: String,
    updated_at: i64,
}

impl ToolConfigRow {
    /// `None` when the settings column does not parse
    fn settings(&self) -> Option<serde_json::Value> {
        lenient_json(&self.tool, "settings", Some(self.settings.as_str()))
    }

    fn into_record(self, tool: Tool, settings: serde_json::Value) -> Result<ToolConfigRecord> {
        Ok(ToolConfigRecord {
            tool,
            enabled: self.enabled,
            settings,
            updated_at: require_millis("updated_at", self.updated_at)?,
        })
    }
}

#[async_trait]
impl ToolConfigRepository for SqliteToolConfigRepository {
    async fn upsert(&self, record: &ToolConfigRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tool_configs (tool, enabled, settings, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(tool) DO UPDATE SET
                enabled = excluded.enabled,
                settings = excluded.settings,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.tool.as_str())
        .bind(record.enabled)
        .bind(record.settings.to_string())
        .bind(to_millis(record.updated_at))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get(&self, tool: Tool) -> Result<Option<ToolConfigRecord>> {
        let row: Option<ToolConfigRow> = sqlx::query_as(
            "SELECT tool, enabled, settings, updated_at FROM tool_configs WHERE tool = ?",
        )
        .bind(tool.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| {
            let settings = r.settings().unwrap_or_else(|| json!({}));
            r.into_record(tool, settings)
        })
        .transpose()
    }

    async fn list(&self) -> Result<Vec<ToolConfigRecord>> {
        let rows: Vec<ToolConfigRow> = sqlx::query_as(
            "SELECT tool, enabled, settings, updated_at FROM tool_configs ORDER BY tool",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let tool = match row.tool.parse::<Tool>() {
                Ok(tool) => tool,
                Err(e) => {
                    warn!(tool = %row.tool, error = %e, "Skipping config for unknown tool");
                    continue;
                }
            };
            let Some(settings) = row.settings() else {
                warn!(tool = %tool, "Skipping config with unparsable settings");
                continue;
            };
            records.push(row.into_record(tool, settings)?);
        }
        Ok(records)
    }

    async fn set_enabled(&self, tool: Tool, enabled: bool, now: DateTime<Utc>) -> Result<bool> {
        let result =
            sqlx::query("UPDATE tool_configs SET enabled = ?, updated_at = ? WHERE tool = ?")
                .bind(enabled)
                .bind(to_millis(now))
                .bind(tool.as_str())
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
