// PostgreSQL JobRepository Implementation (relational engine)

use crate::error::{map_insert_error, map_sqlx_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::{ExecutionRecord, Job, JobStatus, JobType, Priority, Tool};
use devdash_core::error::Result;
use devdash_core::port::{JobRepository, RecordError, RecordResult, StatusPatch};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Row};
use tracing::warn;

const JOB_COLUMNS: &str = "id, job_type, name, priority, status, payload, result, tool, endpoint, \
     created_at, updated_at, started_at, completed_at, retry_count, execution_history";

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    fn engine_name(&self) -> &'static str {
        "postgres-relational"
    }

    async fn insert(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, job_type, name, priority, status,
                payload, result, tool, endpoint,
                created_at, updated_at, started_at, completed_at,
                retry_count, execution_history
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(&job.id)
        .bind(job.job_type.as_str())
        .bind(&job.name)
        .bind(job.priority.value())
        .bind(job.status.as_str())
        .bind(&job.payload)
        .bind(&job.result)
        .bind(job.tool.map(Tool::as_str))
        .bind(&job.endpoint)
        .bind(job.created_at)
        .bind(job.updated_at.max(job.created_at))
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(i32::try_from(job.retry_count).unwrap_or(i32::MAX))
        .bind(Json(&job.execution_history))
        .execute(&self.pool)
        .await
        .map_err(map_insert_error(&job.id))?;

        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM jobs WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
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
        // A non-array history is reset rather than blocking the write
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = $1,
                updated_at = GREATEST($2, created_at),
                started_at = COALESCE($3, started_at),
                completed_at = COALESCE($4, completed_at),
                result = COALESCE($5, result),
                execution_history = CASE
                    WHEN $6::jsonb IS NULL THEN execution_history
                    ELSE (
                        CASE WHEN jsonb_typeof(execution_history) = 'array'
                             THEN execution_history ELSE '[]'::jsonb END
                    ) || jsonb_build_array($6::jsonb)
                END
            WHERE id = $7
            "#,
        )
        .bind(patch.status.as_str())
        .bind(patch.updated_at)
        .bind(patch.started_at)
        .bind(patch.completed_at)
        .bind(&patch.result)
        .bind(patch.history_entry.as_ref().map(Json))
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
        let active: Vec<&str> = JobStatus::ACTIVE.iter().map(|s| s.as_str()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE status = ANY($1) ORDER BY created_at ASC, id ASC",
            JOB_COLUMNS
        ))
        .bind(active)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.iter().map(decode_row).collect())
    }

    async fn list_by_status(&self, status: JobStatus, limit: i64) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE status = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
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
        sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn cleanup_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE status = $1 AND completed_at IS NOT NULL AND completed_at < $2",
        )
        .bind(JobStatus::Completed.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

fn decode_row(row: &PgRow) -> RecordResult {
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
    priority: i32,
    status: String,
    payload: Option<Value>,
    result: Option<Value>,
    tool: Option<String>,
    endpoint: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    retry_count: i32,
    execution_history: Option<Value>,
}

impl JobRow {
    /// Normalize into the shared Job shape (same rules as the legacy engine)
    fn into_job(self) -> RecordResult {
        let id = self.id;
        let bad = |reason: String| RecordError::new(id.as_str(), reason);

        let status = self
            .status
            .parse::<JobStatus>()
            .map_err(|e| bad(format!("{}", e)))?;
        let job_type = self
            .job_type
            .parse::<JobType>()
            .map_err(|e| bad(format!("{}", e)))?;
        let priority =
            Priority::try_from(self.priority).map_err(|e| bad(format!("{}", e)))?;

        if self.name.trim().is_empty() {
            return Err(bad("missing name".to_string()));
        }

        let payload = self
            .payload
            .ok_or_else(|| bad("missing payload".to_string()))?;

        let tool = self.tool.as_deref().and_then(|raw| match raw.parse::<Tool>() {
            Ok(tool) => Some(tool),
            Err(e) => {
                warn!(job_id = %id, error = %e, "Discarding unknown tool");
                None
            }
        });

        let execution_history = match self.execution_history {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => serde_json::from_value::<Vec<ExecutionRecord>>(raw).unwrap_or_else(|e| {
                warn!(job_id = %id, error = %e, "Discarding unparsable execution history");
                Vec::new()
            }),
        };

        Ok(Job {
            job_type,
            name: self.name,
            priority,
            status,
            payload,
            result: self.result.filter(|r| !r.is_null()),
            tool,
            endpoint: self.endpoint,
            created_at: self.created_at,
            updated_at: self.updated_at.max(self.created_at),
            started_at: self.started_at,
            completed_at: self.completed_at,
            retry_count: u32::try_from(self.retry_count).unwrap_or(0),
            execution_history,
            id,
        })
    }
}
