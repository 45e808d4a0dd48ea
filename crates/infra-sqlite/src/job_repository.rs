// SQLite JobRepository Implementation (legacy engine)

use crate::codec::{from_millis, lenient_json, map_insert_error, map_sqlx_error, to_millis};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::{ExecutionRecord, Job, JobStatus, JobType, Priority, Tool};
use devdash_core::error::Result;
use devdash_core::port::{JobRepository, RecordError, RecordResult, StatusPatch};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};
use tracing::warn;

const JOB_COLUMNS: &str = "id, job_type, name, priority, status, payload, result, tool, endpoint, \
     created_at, updated_at, started_at, completed_at, retry_count, execution_history";

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    fn engine_name(&self) -> &'static str {
        "sqlite-legacy"
    }

    async fn insert(&self, job: &Job) -> Result<()> {
        let history = encode_history(&job.execution_history)?;

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, job_type, name, priority, status,
                payload, result, tool, endpoint,
                created_at, updated_at, started_at, completed_at,
                retry_count, execution_history
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(job.job_type.as_str())
        .bind(&job.name)
        .bind(job.priority.value())
        .bind(job.status.as_str())
        .bind(job.payload.to_string())
        .bind(job.result.as_ref().map(|r| r.to_string()))
        .bind(job.tool.map(Tool::as_str))
        .bind(&job.endpoint)
        .bind(to_millis(job.created_at))
        .bind(to_millis(job.updated_at.max(job.created_at)))
        .bind(job.started_at.map(to_millis))
        .bind(job.completed_at.map(to_millis))
        .bind(i64::from(job.retry_count))
        .bind(history)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error(&job.id))?;

        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count > 0)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Some(decode_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: &str, patch: &StatusPatch) -> Result<bool> {
        let entry = patch
            .history_entry
            .as_ref()
            .map(|record| serde_json::to_string(&LegacyHistoryEntry::from(record)))
            .transpose()?;

        // A corrupt history column is reset rather than blocking the write
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = ?,
                updated_at = MAX(?, created_at),
                started_at = COALESCE(?, started_at),
                completed_at = COALESCE(?, completed_at),
                result = COALESCE(?, result),
                execution_history = CASE
                    WHEN ? IS NULL THEN execution_history
                    ELSE json_insert(
                        CASE WHEN json_valid(execution_history) THEN execution_history ELSE '[]' END,
                        '$[#]',
                        json(?)
                    )
                END
            WHERE id = ?
            "#,
        )
        .bind(patch.status.as_str())
        .bind(to_millis(patch.updated_at))
        .bind(patch.started_at.map(to_millis))
        .bind(patch.completed_at.map(to_millis))
        .bind(patch.result.as_ref().map(|r| r.to_string()))
        .bind(entry.as_deref())
        .bind(entry.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            warn!(job_id = %id, status = %patch.status, "Status update for unknown job ignored");
            return Ok(false);
        }
        Ok(true)
    }

    async fn load_active_jobs(&self) -> Result<Vec<RecordResult>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE status IN (?, ?, ?) ORDER BY created_at ASC, id ASC",
            JOB_COLUMNS
        ))
        .bind(JobStatus::ACTIVE[0].as_str())
        .bind(JobStatus::ACTIVE[1].as_str())
        .bind(JobStatus::ACTIVE[2].as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.iter().map(decode_row).collect())
    }

    async fn list_by_status(&self, status: JobStatus, limit: i64) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE status = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            JOB_COLUMNS
        ))
        .bind(status.as_str())
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .iter()
            .filter_map(|row| match decode_row(row) {
                Ok(job) => Some(job),
                Err(e) => {
                    warn!(job_id = %e.id, reason = %e.reason, "Skipping malformed job record");
                    None
                }
            })
            .collect())
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn cleanup_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE status = ? AND completed_at IS NOT NULL AND completed_at < ?",
        )
        .bind(JobStatus::Completed.as_str())
        .bind(to_millis(cutoff))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

/// History entry as stored by the legacy engine (epoch-ms timestamp)
#[derive(Debug, Serialize, Deserialize)]
struct LegacyHistoryEntry {
    attempt: u32,
    status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: i64,
}

impl From<&ExecutionRecord> for LegacyHistoryEntry {
    fn from(record: &ExecutionRecord) -> Self {
        Self {
            attempt: record.attempt,
            status: record.status,
            error: record.error.clone(),
            timestamp: to_millis(record.timestamp),
        }
    }
}

fn encode_history(history: &[ExecutionRecord]) -> Result<String> {
    let entries: Vec<LegacyHistoryEntry> = history.iter().map(LegacyHistoryEntry::from).collect();
    Ok(serde_json::to_string(&entries)?)
}

fn decode_history(job_id: &str, raw: Option<&str>) -> Vec<ExecutionRecord> {
    let entries: Vec<LegacyHistoryEntry> =
        lenient_json(job_id, "execution_history", raw).unwrap_or_default();

    entries
        .into_iter()
        .filter_map(|entry| {
            Some(ExecutionRecord {
                attempt: entry.attempt,
                status: entry.status,
                error: entry.error,
                timestamp: from_millis(entry.timestamp)?,
            })
        })
        .collect()
}

/// Decode one row, turning any failure into a per-record error
fn decode_row(row: &SqliteRow) -> RecordResult {
    match JobRow::from_row(row) {
        Ok(job_row) => job_row.into_job(),
        Err(e) => {
            let id = row
                .try_get::<Option<String>, _>("id")
                .ok()
                .flatten()
                .unwrap_or_else(|| "<unknown>".to_string());
            Err(RecordError::new(id, e.to_string()))
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    job_type: String,
    name: String,
    priority: i64,
    status: String,
    payload: String,
    result: Option<String>,
    tool: Option<String>,
    endpoint: Option<String>,
    created_at: i64,
    updated_at: i64,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    retry_count: i64,
    execution_history: Option<String>,
}

impl JobRow {
    /// Normalize into the shared Job shape.
    ///
    /// Unknown status/type/priority, an empty name, an unparsable payload or
    /// an out-of-range creation time reject the row. Result, tool and history
    /// degrade to empty values with a warning.
    fn into_job(self) -> RecordResult {
        let id = self.id;
        let bad = |reason: String| RecordError::new(id.as_str(), reason);

        let status = self.status.parse::<JobStatus>().map_err(|e| bad(format!("{}", e)))?;
        let job_type = self.job_type.parse::<JobType>().map_err(|e| bad(format!("{}", e)))?;
        let priority = i32::try_from(self.priority)
            .ok()
            .and_then(|p| Priority::try_from(p).ok())
            .ok_or_else(|| bad(format!("priority {} out of range", self.priority)))?;

        if self.name.trim().is_empty() {
            return Err(bad("missing name".to_string()));
        }

        let created_at = from_millis(self.created_at)
            .ok_or_else(|| bad(format!("created_at {} out of range", self.created_at)))?;
        let updated_at = from_millis(self.updated_at)
            .unwrap_or(created_at)
            .max(created_at);

        let payload = serde_json::from_str(&self.payload)
            .map_err(|e| bad(format!("payload is not valid JSON: {}", e)))?;

        let result = lenient_json(&id, "result", self.result.as_deref());
        let tool = self.tool.as_deref().and_then(|raw| match raw.parse::<Tool>() {
            Ok(tool) => Some(tool),
            Err(e) => {
                warn!(job_id = %id, error = %e, "Discarding unknown tool");
                None
            }
        });
        let execution_history = decode_history(&id, self.execution_history.as_deref());

        Ok(Job {
            job_type,
            name: self.name,
            priority,
            status,
            payload,
            result,
            tool,
            endpoint: self.endpoint,
            created_at,
            updated_at,
            started_at: self.started_at.and_then(from_millis),
            completed_at: self.completed_at.and_then(from_millis),
            retry_count: u32::try_from(self.retry_count).unwrap_or(0),
            execution_history,
            id,
        })
    }
}
