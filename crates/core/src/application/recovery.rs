// Startup recovery: rehydrate the in-memory queue from the durable store
use crate::application::job_queue::JobQueue;
use crate::domain::JobStatus;
use crate::port::JobRepository;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one recovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records made addressable in this pass
    pub restored: usize,
    /// Of those, PENDING records put back on the schedule
    pub requeued: usize,
    /// Records already resident (recovery ran before in this process)
    pub already_loaded: usize,
    /// Malformed records logged and skipped
    pub skipped: usize,
    /// RUNNING records left over from a previous process
    pub stale_running: usize,
}

/// Recovery service
///
/// On startup, loads every non-settled job and re-seeds the queue. Jobs left
/// RUNNING by a dead process stay RUNNING: they become addressable but are
/// not rescheduled, and no staleness reconciliation is attempted.
pub struct RecoveryService {
    job_repo: Arc<dyn JobRepository>,
    queue: Arc<JobQueue>,
}

impl RecoveryService {
    pub fn new(job_repo: Arc<dyn JobRepository>, queue: Arc<JobQueue>) -> Self {
        Self { job_repo, queue }
    }

    /// Run one recovery pass.
    ///
    /// Best effort per record: a malformed row is logged and skipped. Only a
    /// failure to read the store at all is returned as an error.
    pub async fn recover(&self) -> crate::error::Result<RecoveryReport> {
        info!(engine = self.job_repo.engine_name(), "Starting job recovery");

        let records = self.job_repo.load_active_jobs().await?;
        let mut report = RecoveryReport::default();

        for record in records {
            let job = match record {
                Ok(job) => job,
                Err(e) => {
                    warn!(job_id = %e.id, reason = %e.reason, "Skipping malformed job record");
                    report.skipped += 1;
                    continue;
                }
            };

            let status = job.status;
            let job_id = job.id.clone();

            if !self.queue.restore(job).await {
                report.already_loaded += 1;
                continue;
            }

            report.restored += 1;
            match status {
                JobStatus::Pending => report.requeued += 1,
                JobStatus::Running => {
                    report.stale_running += 1;
                    info!(job_id = %job_id, "Recovered RUNNING job left as-is");
                }
                _ => {}
            }
        }

        if report.stale_running > 0 {
            warn!(
                stale_running = report.stale_running,
                "Jobs were RUNNING when the previous process stopped; they are not rescheduled"
            );
        }

        info!(
            restored = report.restored,
            requeued = report.requeued,
            skipped = report.skipped,
            "Job recovery complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Job, JobType, Priority};
    use crate::port::id_provider::UuidProvider;
    use crate::port::job_repository::mocks::MockJobRepository;
    use crate::port::time_provider::mocks::ManualClock;
    use crate::port::TimeProvider;
    use serde_json::json;

    fn stored_job(id: &str, status: JobStatus, clock: &ManualClock) -> Job {
        let mut job = Job::new(
            id,
            clock.now(),
            JobType::DataRefresh,
            format!("job {}", id),
            Priority::Medium,
            json!({}),
        );
        job.status = status;
        job
    }

    fn setup(repo: Arc<MockJobRepository>) -> (Arc<JobQueue>, RecoveryService) {
        let queue = Arc::new(JobQueue::new(
            repo.clone(),
            Arc::new(UuidProvider),
            Arc::new(ManualClock::at_millis(0)),
        ));
        let recovery = RecoveryService::new(repo, queue.clone());
        (queue, recovery)
    }

    fn seeded_repo() -> Arc<MockJobRepository> {
        let clock = ManualClock::at_millis(1_000);
        let repo = Arc::new(MockJobRepository::new());
        repo.seed(stored_job("pending", JobStatus::Pending, &clock));
        repo.seed(stored_job("running", JobStatus::Running, &clock));
        repo.seed(stored_job("failed", JobStatus::Failed, &clock));
        repo.seed(stored_job("completed", JobStatus::Completed, &clock));
        repo.seed(stored_job("cancelled", JobStatus::Cancelled, &clock));
        repo
    }

    #[tokio::test]
    async fn test_only_pending_is_rescheduled() {
        let (queue, recovery) = setup(seeded_repo());

        let report = recovery.recover().await.unwrap();
        assert_eq!(report.restored, 3);
        assert_eq!(report.requeued, 1);
        assert_eq!(report.stale_running, 1);

        assert_eq!(queue.len().await, 1);
        assert!(queue.is_scheduled("pending").await);
        assert_eq!(queue.get("running").await.unwrap().status, JobStatus::Running);
        assert_eq!(queue.get("failed").await.unwrap().status, JobStatus::Failed);
        assert!(queue.get("completed").await.is_none());
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let (queue, recovery) = setup(seeded_repo());

        recovery.recover().await.unwrap();
        let again = recovery.recover().await.unwrap();

        assert_eq!(again.restored, 0);
        assert_eq!(again.already_loaded, 3);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_malformed_record_is_skipped() {
        let repo = seeded_repo();
        repo.seed_corrupt("broken", "payload is not valid JSON");
        let (queue, recovery) = setup(repo);

        let report = recovery.recover().await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.restored, 3);
        assert!(queue.get("broken").await.is_none());
    }
}
