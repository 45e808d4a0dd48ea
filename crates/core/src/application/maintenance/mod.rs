// Maintenance Service
// Retention-based cleanup of settled jobs and expired sibling records

use crate::application::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::{JobRepository, RateLimitRepository, SessionRepository, TimeProvider};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Maintenance configuration
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// COMPLETED jobs older than this are deleted (days)
    pub retention_days: i64,

    /// How often the sweep runs (hours)
    pub interval_hours: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            retention_days: 7, // Keep completed jobs for 7 days
            interval_hours: 24,
        }
    }
}

/// Rows removed by one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub deleted_jobs: u64,
    pub deleted_sessions: u64,
    pub deleted_rate_limits: u64,
}

/// Maintenance scheduler
///
/// Runs the cleanup sweep periodically in the background. FAILED jobs are
/// never swept; they stay for operator inspection.
pub struct MaintenanceScheduler {
    job_repo: Arc<dyn JobRepository>,
    sessions: Option<Arc<dyn SessionRepository>>,
    rate_limits: Option<Arc<dyn RateLimitRepository>>,
    time_provider: Arc<dyn TimeProvider>,
    config: MaintenanceConfig,
}

impl MaintenanceScheduler {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        time_provider: Arc<dyn TimeProvider>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            job_repo,
            sessions: None,
            rate_limits: None,
            time_provider,
            config,
        }
    }

    /// Also purge expired sessions on every sweep
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionRepository>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Also purge rate-limit snapshots whose window has reset
    pub fn with_rate_limits(mut self, rate_limits: Arc<dyn RateLimitRepository>) -> Self {
        self.rate_limits = Some(rate_limits);
        self
    }

    /// Run maintenance loop until shutdown (spawn with tokio::spawn)
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_hours = self.config.interval_hours,
            retention_days = self.config.retention_days,
            "Maintenance scheduler started"
        );

        let period = Duration::from_secs(self.config.interval_hours.max(1) * 3600);

        loop {
            match shutdown.run_until(self.run_now()).await {
                Some(Ok(report)) => info!(
                    deleted_jobs = report.deleted_jobs,
                    deleted_sessions = report.deleted_sessions,
                    deleted_rate_limits = report.deleted_rate_limits,
                    "Scheduled maintenance completed"
                ),
                Some(Err(e)) => error!(error = %e, "Scheduled maintenance failed"),
                None => break,
            }

            if !shutdown.sleep(period).await {
                break;
            }
        }

        info!("Maintenance scheduler stopped");
    }

    /// Run one sweep immediately
    pub async fn run_now(&self) -> Result<MaintenanceReport> {
        let now = self.time_provider.now();
        let cutoff = now - ChronoDuration::days(self.config.retention_days);

        let mut report = MaintenanceReport {
            deleted_jobs: self.job_repo.cleanup_completed_before(cutoff).await?,
            ..Default::default()
        };

        if let Some(sessions) = &self.sessions {
            report.deleted_sessions = sessions.delete_expired(now).await?;
        }
        if let Some(rate_limits) = &self.rate_limits {
            report.deleted_rate_limits = rate_limits.delete_expired(now).await?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::{Job, JobStatus, JobType, Priority};
    use crate::port::job_repository::mocks::MockJobRepository;
    use crate::port::time_provider::mocks::ManualClock;
    use serde_json::json;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn finished(id: &str, status: JobStatus, at: chrono::DateTime<chrono::Utc>) -> Job {
        let mut job = Job::new(id, at, JobType::CacheWarm, id, Priority::Low, json!({}));
        job.status = status;
        if status == JobStatus::Completed {
            job.completed_at = Some(at);
        }
        job
    }

    #[tokio::test]
    async fn test_sweep_respects_status_and_age() {
        let clock = Arc::new(ManualClock::at_millis(30 * DAY_MS));
        let repo = Arc::new(MockJobRepository::new());
        let old = clock.now() - ChronoDuration::days(10);
        let recent = clock.now() - ChronoDuration::days(1);

        repo.seed(finished("old-done", JobStatus::Completed, old));
        repo.seed(finished("old-failed", JobStatus::Failed, old));
        repo.seed(finished("new-done", JobStatus::Completed, recent));

        let scheduler =
            MaintenanceScheduler::new(repo.clone(), clock, MaintenanceConfig::default());
        let report = scheduler.run_now().await.unwrap();

        assert_eq!(report.deleted_jobs, 1);
        assert!(repo.stored("old-done").is_none());
        assert!(repo.stored("old-failed").is_some());
        assert!(repo.stored("new-done").is_some());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let repo = Arc::new(MockJobRepository::new());
        let scheduler = MaintenanceScheduler::new(
            repo,
            Arc::new(ManualClock::at_millis(DAY_MS)),
            MaintenanceConfig::default(),
        );

        let (tx, token) = shutdown_channel();
        let handle = tokio::spawn(scheduler.run(token));
        tx.shutdown();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
