//! Recovery across process restarts on an on-disk legacy database

mod common;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use devdash_core::application::{JobQueue, RecoveryService};
use devdash_core::domain::{JobSpec, JobStatus, JobType, Priority};
use devdash_storage::{DatabaseHandle, RepositoryFactory};

/// One "process": a fresh handle, factory and queue over the same file
struct Process {
    factory: RepositoryFactory,
    queue: Arc<JobQueue>,
}

impl Process {
    async fn start(path: &Path) -> Self {
        let handle = DatabaseHandle::connect(&common::sqlite_url(path), 2)
            .await
            .unwrap();
        let factory = RepositoryFactory::new(handle, common::cipher());
        let queue = common::queue_for(factory.repositories().unwrap(), common::clock());
        Self { factory, queue }
    }

    async fn recover(&self) -> devdash_core::application::RecoveryReport {
        RecoveryService::new(self.factory.jobs().unwrap(), self.queue.clone())
            .recover()
            .await
            .unwrap()
    }

    /// Drain the schedule. `dequeue` writes nothing durable, so the store is
    /// unaffected.
    async fn scheduled(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        while let Some(job) = self.queue.dequeue().await {
            ids.insert(job.id);
        }
        ids
    }

    async fn stop(self) {
        self.factory.handle().close().await;
    }
}

struct Ids {
    pending: String,
    running: String,
    completed: String,
    cancelled: String,
}

/// First process: leave one job in each of PENDING, RUNNING, COMPLETED, CANCELLED
async fn seed(path: &Path) -> Ids {
    let process = Process::start(path).await;
    let queue = &process.queue;

    let enqueue = |name: &'static str, priority| {
        let queue = queue.clone();
        async move {
            queue
                .enqueue(JobSpec::new(JobType::DataRefresh, name, priority))
                .await
                .unwrap()
                .id
        }
    };

    let running = enqueue("running", Priority::Critical).await;
    let completed = enqueue("completed", Priority::High).await;
    let cancelled = enqueue("cancelled", Priority::Medium).await;
    let pending = enqueue("pending", Priority::Low).await;

    assert!(queue.cancel(&cancelled).await.unwrap());

    assert_eq!(queue.dequeue().await.unwrap().id, running);
    queue
        .update_status(&running, JobStatus::Running, None)
        .await
        .unwrap();

    assert_eq!(queue.dequeue().await.unwrap().id, completed);
    queue
        .update_status(&completed, JobStatus::Completed, None)
        .await
        .unwrap();

    process.stop().await;
    Ids {
        pending,
        running,
        completed,
        cancelled,
    }
}

#[tokio::test]
async fn test_recovery_after_restart() {
    let path = common::scratch_db_path();
    let ids = seed(&path).await;

    let process = Process::start(&path).await;
    let report = process.recover().await;
    assert_eq!(report.restored, 2);
    assert_eq!(report.requeued, 1);
    assert_eq!(report.stale_running, 1);
    assert_eq!(report.skipped, 0);

    // Exactly the PENDING job is scheduled
    assert_eq!(process.queue.len().await, 1);
    assert!(process.queue.is_scheduled(&ids.pending).await);

    // RUNNING is resident but left as-is
    let running = process.queue.get(&ids.running).await.unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert!(!process.queue.is_scheduled(&ids.running).await);

    // Settled jobs stay addressable through the store
    let jobs = process.factory.jobs().unwrap();
    let completed = jobs.find_by_id(&ids.completed).await.unwrap().unwrap();
    assert_eq!(completed.status, JobStatus::Completed);
    assert!(completed.completed_at.is_some());
    let cancelled = jobs.find_by_id(&ids.cancelled).await.unwrap().unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);

    process.stop().await;
    common::remove_db_files(&path);
}

#[tokio::test]
async fn test_recovery_is_deterministic_across_restarts() {
    let path = common::scratch_db_path();
    let ids = seed(&path).await;

    let mut memberships = Vec::new();
    for _ in 0..2 {
        let process = Process::start(&path).await;
        process.recover().await;
        memberships.push(process.scheduled().await);
        process.stop().await;
    }

    assert_eq!(memberships[0], memberships[1]);
    assert_eq!(memberships[0], BTreeSet::from([ids.pending]));

    common::remove_db_files(&path);
}

#[tokio::test]
async fn test_recovered_job_runs_to_completion() {
    let path = common::scratch_db_path();
    let ids = seed(&path).await;

    let process = Process::start(&path).await;
    process.recover().await;

    let job = process.queue.dequeue().await.unwrap();
    assert_eq!(job.id, ids.pending);
    process
        .queue
        .update_status(&job.id, JobStatus::Running, None)
        .await
        .unwrap();
    process
        .queue
        .update_status(&job.id, JobStatus::Completed, Some(serde_json::json!({"ok": true})))
        .await
        .unwrap();
    process.stop().await;

    // Nothing left to schedule after the next restart
    let process = Process::start(&path).await;
    let report = process.recover().await;
    assert_eq!(report.requeued, 0);
    assert!(process.queue.is_empty().await);
    process.stop().await;

    common::remove_db_files(&path);
}
