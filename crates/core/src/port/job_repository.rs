// Job Repository Port (Interface)

use crate::domain::{ExecutionRecord, Job, JobStatus};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A durable row that could not be normalized into a [`Job`]
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed job record {id}: {reason}")]
pub struct RecordError {
    pub id: String,
    pub reason: String,
}

impl RecordError {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Per-row outcome of a bulk load
pub type RecordResult = std::result::Result<Job, RecordError>;

/// Partial status update. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPatch {
    pub status: JobStatus,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    /// Appended to the stored execution history, never replacing it
    pub history_entry: Option<ExecutionRecord>,
}

impl StatusPatch {
    pub fn new(status: JobStatus, updated_at: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at,
            started_at: None,
            completed_at: None,
            result: None,
            history_entry: None,
        }
    }

    /// Snapshot of a job's status fields after an in-memory transition
    pub fn from_job(job: &Job, history_entry: Option<ExecutionRecord>) -> Self {
        Self {
            status: job.status,
            updated_at: job.updated_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            result: job.result.clone(),
            history_entry,
        }
    }
}

/// Repository interface for Job persistence
///
/// Implemented once per storage engine; every implementation produces and
/// consumes the normalized [`Job`] shape.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Engine label for logs
    fn engine_name(&self) -> &'static str;

    /// Insert a new job. Fails with `AppError::DuplicateKey` if the id exists.
    async fn insert(&self, job: &Job) -> Result<()>;

    /// Existence check (enqueue pre-flight)
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Find job by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Job>>;

    /// Apply a partial status update.
    ///
    /// Returns `false` (after logging) when the id is unknown; a status update
    /// racing an external delete is not an error. `updated_at` is never
    /// stored earlier than `created_at`.
    async fn update_status(&self, id: &str, patch: &StatusPatch) -> Result<bool>;

    /// All PENDING, RUNNING and FAILED records, oldest first (recovery only).
    ///
    /// Rows that cannot be normalized are returned as `Err` entries instead of
    /// failing the whole load.
    async fn load_active_jobs(&self) -> Result<Vec<RecordResult>>;

    /// Jobs in one status, newest first. Malformed rows are skipped.
    async fn list_by_status(&self, status: JobStatus, limit: i64) -> Result<Vec<Job>>;

    /// Count jobs by status
    async fn count_by_status(&self, status: JobStatus) -> Result<i64>;

    /// Delete COMPLETED jobs with `completed_at < cutoff`; never touches other statuses.
    ///
    /// # Returns
    /// Number of jobs deleted
    async fn cleanup_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory JobRepository with failure injection
    #[derive(Default)]
    pub struct MockJobRepository {
        jobs: Mutex<HashMap<String, Job>>,
        corrupt: Mutex<Vec<RecordError>>,
        fail_writes: AtomicBool,
        insert_calls: AtomicUsize,
        update_calls: AtomicUsize,
    }

    impl MockJobRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every subsequent write fail with `AppError::Database`
        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Seed a stored job directly (bypasses failure injection)
        pub fn seed(&self, job: Job) {
            self.jobs.lock().unwrap().insert(job.id.clone(), job);
        }

        /// Seed a row that fails normalization on load
        pub fn seed_corrupt(&self, id: impl Into<String>, reason: impl Into<String>) {
            self.corrupt
                .lock()
                .unwrap()
                .push(RecordError::new(id, reason));
        }

        pub fn stored(&self, id: &str) -> Option<Job> {
            self.jobs.lock().unwrap().get(id).cloned()
        }

        pub fn insert_calls(&self) -> usize {
            self.insert_calls.load(Ordering::SeqCst)
        }

        pub fn update_calls(&self) -> usize {
            self.update_calls.load(Ordering::SeqCst)
        }

        fn check_writable(&self) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Database("connection reset by peer".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl JobRepository for MockJobRepository {
        fn engine_name(&self) -> &'static str {
            "mock"
        }

        async fn insert(&self, job: &Job) -> Result<()> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            self.check_writable()?;

            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(AppError::DuplicateKey(job.id.clone()));
            }
            jobs.insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn exists(&self, id: &str) -> Result<bool> {
            Ok(self.jobs.lock().unwrap().contains_key(id))
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<Job>> {
            Ok(self.stored(id))
        }

        async fn update_status(&self, id: &str, patch: &StatusPatch) -> Result<bool> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            self.check_writable()?;

            let mut jobs = self.jobs.lock().unwrap();
            let Some(job) = jobs.get_mut(id) else {
                tracing::warn!(job_id = %id, "Status update for unknown job ignored");
                return Ok(false);
            };

            job.status = patch.status;
            job.updated_at = patch.updated_at.max(job.created_at);
            if patch.started_at.is_some() {
                job.started_at = patch.started_at;
            }
            if patch.completed_at.is_some() {
                job.completed_at = patch.completed_at;
            }
            if patch.result.is_some() {
                job.result = patch.result.clone();
            }
            if let Some(entry) = &patch.history_entry {
                job.execution_history.push(entry.clone());
            }
            Ok(true)
        }

        async fn load_active_jobs(&self) -> Result<Vec<RecordResult>> {
            let mut active: Vec<Job> = self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|job| JobStatus::ACTIVE.contains(&job.status))
                .cloned()
                .collect();
            active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

            let mut loaded: Vec<RecordResult> = active.into_iter().map(Ok).collect();
            loaded.extend(self.corrupt.lock().unwrap().iter().cloned().map(Err));
            Ok(loaded)
        }

        async fn list_by_status(&self, status: JobStatus, limit: i64) -> Result<Vec<Job>> {
            let mut jobs: Vec<Job> = self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|job| job.status == status)
                .cloned()
                .collect();
            jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            jobs.truncate(limit.max(0) as usize);
            Ok(jobs)
        }

        async fn count_by_status(&self, status: JobStatus) -> Result<i64> {
            Ok(self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|job| job.status == status)
                .count() as i64)
        }

        async fn cleanup_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
            self.check_writable()?;

            let mut jobs = self.jobs.lock().unwrap();
            let before = jobs.len();
            jobs.retain(|_, job| {
                !(job.status == JobStatus::Completed
                    && job.completed_at.is_some_and(|done| done < cutoff))
            });
            Ok((before - jobs.len()) as u64)
        }
    }
}
