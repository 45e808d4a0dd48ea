// Job Queue Facade
//
// Composes the in-memory PriorityQueue (ordering/dispatch) with a
// JobRepository (durability). All in-memory state sits behind one mutex.

use crate::domain::{Job, JobId, JobSpec, JobStatus, PriorityQueue};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobRepository, StatusPatch, TimeProvider};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Point-in-time queue counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total: usize,
    /// Jobs that contributed to the average
    pub executed: u64,
    pub average_execution_ms: f64,
}

/// Incrementally maintained counters (O(1) per update)
#[derive(Debug, Default)]
struct StatsTracker {
    counts: HashMap<JobStatus, usize>,
    executed: u64,
    average_execution_ms: f64,
}

impl StatsTracker {
    fn added(&mut self, status: JobStatus) {
        *self.counts.entry(status).or_default() += 1;
    }

    fn moved(&mut self, from: JobStatus, to: JobStatus) {
        if from == to {
            return;
        }
        if let Some(count) = self.counts.get_mut(&from) {
            *count = count.saturating_sub(1);
        }
        *self.counts.entry(to).or_default() += 1;
    }

    fn executed(&mut self, duration_ms: i64) {
        self.executed += 1;
        self.average_execution_ms +=
            (duration_ms as f64 - self.average_execution_ms) / self.executed as f64;
    }

    fn snapshot(&self) -> QueueStats {
        let count = |status| self.counts.get(&status).copied().unwrap_or(0);
        let stats = QueueStats {
            pending: count(JobStatus::Pending),
            running: count(JobStatus::Running),
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
            cancelled: count(JobStatus::Cancelled),
            total: 0,
            executed: self.executed,
            average_execution_ms: self.average_execution_ms,
        };
        QueueStats {
            total: stats.pending + stats.running + stats.completed + stats.failed + stats.cancelled,
            ..stats
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    /// Invariant: holds exactly the ids of PENDING jobs in `jobs`
    pending: PriorityQueue<JobId>,
    jobs: HashMap<JobId, Job>,
    stats: StatsTracker,
}

/// Durable priority job queue
///
/// Used by the scheduler loop (`dequeue` / `update_status`) and by route
/// handlers (`enqueue`, `cancel`, `get`, `get_stats`).
pub struct JobQueue {
    job_repo: Arc<dyn JobRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    state: Mutex<QueueState>,
}

impl JobQueue {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            job_repo,
            id_provider,
            time_provider,
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Validate, persist, then schedule a new job.
    ///
    /// The durable insert happens under the lock: a job must not become
    /// dequeueable before the store has confirmed it. On any failure the
    /// in-memory state is left untouched.
    ///
    /// # Errors
    /// - `AppError::Validation` naming the offending field
    /// - `AppError::DuplicateKey` if the id is resident or already stored
    /// - `AppError::Database` if the insert fails
    pub async fn enqueue(&self, spec: JobSpec) -> Result<Job> {
        let now = self.time_provider.now();
        let job = Job::from_spec(spec, self.id_provider.generate_id(), now)?;

        let mut guard = self.state.lock().await;

        if guard.jobs.contains_key(&job.id) {
            return Err(AppError::DuplicateKey(job.id));
        }
        if self.job_repo.exists(&job.id).await? {
            return Err(AppError::DuplicateKey(job.id));
        }

        self.job_repo.insert(&job).await?;

        let state = &mut *guard;
        state.pending.enqueue(job.id.clone(), job.priority.value());
        state.stats.added(job.status);
        state.jobs.insert(job.id.clone(), job.clone());

        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            priority = job.priority.value(),
            "Job enqueued"
        );
        Ok(job)
    }

    /// Pop the highest-priority PENDING job and mark it RUNNING in memory.
    ///
    /// The durable RUNNING write is left to the caller's following
    /// `update_status` call. Returns `None` when nothing is pending.
    pub async fn dequeue(&self) -> Option<Job> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        while let Some(id) = state.pending.dequeue() {
            let Some(job) = state.jobs.get_mut(&id) else {
                warn!(job_id = %id, "Queued id without a resident job, dropping");
                continue;
            };

            if let Err(e) = job.start(self.time_provider.now()) {
                warn!(job_id = %id, error = %e, "Queued job is not PENDING, dropping");
                continue;
            }

            state.stats.moved(JobStatus::Pending, JobStatus::Running);
            debug!(job_id = %id, "Job dequeued");
            return Some(job.clone());
        }

        None
    }

    /// Cancel a PENDING or RUNNING job.
    ///
    /// Returns `Ok(false)` for unknown ids and jobs already terminal. A RUNNING
    /// job is only marked; interrupting its side effects is the processor's job.
    pub async fn cancel(&self, id: &str) -> Result<bool> {
        let now = self.time_provider.now();

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(job) = state.jobs.get_mut(id) else {
            return Ok(false);
        };
        if job.status.is_terminal() {
            debug!(job_id = %id, status = %job.status, "Cancel ignored for terminal job");
            return Ok(false);
        }

        let previous = job.clone();
        let entry = job.transition(JobStatus::Cancelled, None, now)?.clone();
        let patch = StatusPatch::from_job(job, Some(entry));

        if let Err(e) = self.persist(id, &patch).await {
            warn!(job_id = %id, "Cancel not stored, job left unchanged");
            *job = previous;
            return Err(e);
        }

        if previous.status == JobStatus::Pending {
            state.pending.remove(&previous.id);
        }
        state.stats.moved(previous.status, JobStatus::Cancelled);

        info!(job_id = %id, "Job cancelled");
        Ok(true)
    }

    /// Move a job to `status`, append one history entry and persist it.
    ///
    /// The durable write happens under the lock, so stored transitions land
    /// in the same order as the in-memory ones. Returns `Ok(None)` when this
    /// process has no record of the job (for example after a restart without
    /// recovery).
    ///
    /// # Errors
    /// - `AppError::InvalidState` for a transition the state machine forbids
    /// - `AppError::Database` if the durable write fails (in-memory state is unchanged)
    pub async fn update_status(
        &self,
        id: &str,
        status: JobStatus,
        result: Option<serde_json::Value>,
    ) -> Result<Option<Job>> {
        let now = self.time_provider.now();

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(job) = state.jobs.get_mut(id) else {
            debug!(job_id = %id, "Status update for job not resident in this process");
            return Ok(None);
        };

        let previous = job.clone();
        let entry = job.transition(status, result, now)?.clone();
        let patch = StatusPatch::from_job(job, Some(entry));

        if let Err(e) = self.persist(id, &patch).await {
            warn!(job_id = %id, status = %status, "Status change not stored, job left unchanged");
            *job = previous;
            return Err(e);
        }

        let elapsed_ms = match (previous.status, status) {
            (JobStatus::Running, JobStatus::Completed | JobStatus::Failed) => job.elapsed_ms(now),
            _ => None,
        };
        let updated = job.clone();

        if previous.status == JobStatus::Pending && status != JobStatus::Pending {
            state.pending.remove(&previous.id);
        }
        state.stats.moved(previous.status, status);
        if let Some(ms) = elapsed_ms {
            state.stats.executed(ms);
        }

        info!(job_id = %id, status = %status, "Job status updated");
        Ok(Some(updated))
    }

    /// Make a stored job resident again (recovery).
    ///
    /// PENDING jobs are scheduled at their stored priority; other statuses are
    /// only addressable. Returns `false` if the id is already resident.
    pub async fn restore(&self, job: Job) -> bool {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.jobs.contains_key(&job.id) {
            return false;
        }
        if job.status == JobStatus::Pending {
            state.pending.enqueue(job.id.clone(), job.priority.value());
        }
        state.stats.added(job.status);
        state.jobs.insert(job.id.clone(), job);
        true
    }

    /// Resident job by id (any status)
    pub async fn get(&self, id: &str) -> Option<Job> {
        self.state.lock().await.jobs.get(id).cloned()
    }

    /// Whether `id` is currently scheduled for execution
    pub async fn is_scheduled(&self, id: &str) -> bool {
        self.state.lock().await.pending.has(&id.to_string())
    }

    /// Next job `dequeue` would return, without removing it
    pub async fn peek(&self) -> Option<Job> {
        let guard = self.state.lock().await;
        guard
            .pending
            .peek()
            .and_then(|id| guard.jobs.get(id))
            .cloned()
    }

    /// Number of scheduled (PENDING) jobs
    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get_stats(&self) -> QueueStats {
        self.state.lock().await.stats.snapshot()
    }

    /// Drop all in-memory state; stored records are untouched. Test isolation only.
    pub async fn clear(&self) {
        let mut guard = self.state.lock().await;
        *guard = QueueState::default();
    }

    /// Store a status patch. A row missing from the store is logged, not an error.
    async fn persist(&self, id: &str, patch: &StatusPatch) -> Result<()> {
        if !self.job_repo.update_status(id, patch).await? {
            warn!(
                job_id = %id,
                engine = self.job_repo.engine_name(),
                "Job missing from durable store; in-memory status kept"
            );
        }
        Ok(())
    }
}
