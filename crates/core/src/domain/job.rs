// Job Domain Model

use super::error::{DomainError, Result};
use super::records::Tool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Job ID (UUID v4 unless supplied by the caller)
pub type JobId = String;

/// Job Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// Statuses reloaded on startup (everything not settled)
    pub const ACTIVE: [JobStatus; 3] = [JobStatus::Pending, JobStatus::Running, JobStatus::Failed];

    pub const fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Forward-only state machine.
    ///
    /// RUNNING -> RUNNING is accepted so a scheduler can persist the state it
    /// received from `dequeue`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;

        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Running, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "RUNNING" => Ok(JobStatus::Running),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            other => Err(DomainError::UnknownVariant {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Job category, drives which processor executes the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    CacheWarm,
    DataRefresh,
    RateLimitUpdate,
    Maintenance,
    UserOperation,
}

impl JobType {
    pub const fn as_str(self) -> &'static str {
        match self {
            JobType::CacheWarm => "cache-warm",
            JobType::DataRefresh => "data-refresh",
            JobType::RateLimitUpdate => "rate-limit-update",
            JobType::Maintenance => "maintenance",
            JobType::UserOperation => "user-operation",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cache-warm" => Ok(JobType::CacheWarm),
            "data-refresh" => Ok(JobType::DataRefresh),
            "rate-limit-update" => Ok(JobType::RateLimitUpdate),
            "maintenance" => Ok(JobType::Maintenance),
            "user-operation" => Ok(JobType::UserOperation),
            other => Err(DomainError::UnknownVariant {
                kind: "type",
                value: other.to_string(),
            }),
        }
    }
}

/// Priority (higher number = dequeued first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
#[repr(i32)]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl Priority {
    pub const fn value(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Priority {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            4 => Ok(Priority::Critical),
            other => Err(DomainError::UnknownVariant {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

impl From<Priority> for i32 {
    fn from(priority: Priority) -> Self {
        priority.value()
    }
}

/// One entry of a job's append-only audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub attempt: u32,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Enqueue request as received from callers (unvalidated)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub job_type: String,
    pub name: String,
    pub priority: i32,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub tool: Option<Tool>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
}

impl JobSpec {
    pub fn new(job_type: JobType, name: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: None,
            job_type: job_type.as_str().to_string(),
            name: name.into(),
            priority: priority.value(),
            payload: serde_json::Value::Null,
            tool: None,
            endpoint: None,
            retry_count: 0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_target(mut self, tool: Tool, endpoint: impl Into<String>) -> Self {
        self.tool = Some(tool);
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// Job Entity (normalized record shared by every storage engine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub name: String,
    pub priority: Priority,
    pub status: JobStatus,

    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub tool: Option<Tool>,
    pub endpoint: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub retry_count: u32,
    pub execution_history: Vec<ExecutionRecord>,
}

impl Job {
    /// Create a new PENDING job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `now` - Creation instant (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        now: DateTime<Utc>,
        job_type: JobType,
        name: impl Into<String>,
        priority: Priority,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            job_type,
            name: name.into(),
            priority,
            status: JobStatus::Pending,
            payload,
            result: None,
            tool: None,
            endpoint: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            execution_history: Vec::new(),
        }
    }

    /// Validate an enqueue request and build the PENDING job.
    ///
    /// `fallback_id` is used when the request carries no id.
    pub fn from_spec(spec: JobSpec, fallback_id: JobId, now: DateTime<Utc>) -> Result<Self> {
        let id = match spec.id {
            Some(id) if id.trim().is_empty() => {
                return Err(DomainError::ValidationError {
                    field: "id",
                    message: "must not be empty".to_string(),
                })
            }
            Some(id) => id,
            None => fallback_id,
        };

        if spec.name.trim().is_empty() {
            return Err(DomainError::ValidationError {
                field: "name",
                message: "must not be empty".to_string(),
            });
        }

        let job_type = spec
            .job_type
            .parse::<JobType>()
            .map_err(|_| DomainError::ValidationError {
                field: "type",
                message: format!("unknown job type '{}'", spec.job_type),
            })?;

        let priority =
            Priority::try_from(spec.priority).map_err(|_| DomainError::ValidationError {
                field: "priority",
                message: format!("unknown priority {}", spec.priority),
            })?;

        let mut job = Job::new(id, now, job_type, spec.name, priority, spec.payload);
        job.tool = spec.tool;
        job.endpoint = spec.endpoint;
        job.retry_count = spec.retry_count;
        Ok(job)
    }

    /// PENDING -> RUNNING, stamping `started_at`. Does not touch the history.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != JobStatus::Pending {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::Running.to_string(),
            });
        }
        self.status = JobStatus::Running;
        self.started_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Apply a caller-driven status change and append one history entry.
    ///
    /// A FAILED result object carrying an `error` string has that string
    /// copied into the history entry.
    pub fn transition(
        &mut self,
        next: JobStatus,
        result: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<&ExecutionRecord> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        let error = match (next, &result) {
            (JobStatus::Failed, Some(value)) => value
                .get("error")
                .and_then(|e| e.as_str())
                .map(str::to_string),
            _ => None,
        };

        self.status = next;
        self.touch(now);

        if next == JobStatus::Running && self.started_at.is_none() {
            self.started_at = Some(self.updated_at);
        }
        if next == JobStatus::Completed {
            self.completed_at = Some(self.updated_at);
        }
        if result.is_some() {
            self.result = result;
        }

        self.execution_history.push(ExecutionRecord {
            attempt: self.retry_count + 1,
            status: next,
            error,
            timestamp: self.updated_at,
        });

        // Just pushed
        Ok(&self.execution_history[self.execution_history.len() - 1])
    }

    /// Milliseconds between start and now, if the job was started
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        self.started_at
            .map(|started| (now - started).num_milliseconds().max(0))
    }

    // updated_at never moves before created_at
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn pending_job() -> Job {
        Job::new(
            "job-1",
            at(1_000),
            JobType::DataRefresh,
            "Refresh GitHub pulls",
            Priority::High,
            json!({"repo": "acme/api"}),
        )
    }

    #[test]
    fn test_priority_ordering_matches_numeric_value() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!(Priority::Critical.value(), 4);
        assert!(Priority::try_from(0).is_err());
    }

    #[test]
    fn test_status_state_machine() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = pending_job();
        assert_eq!(job.status, JobStatus::Pending);

        job.start(at(2_000)).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.started_at, Some(at(2_000)));
        assert!(job.execution_history.is_empty());

        job.transition(JobStatus::Completed, Some(json!({"fetched": 12})), at(3_000))
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed_at, Some(at(3_000)));
        assert_eq!(job.result, Some(json!({"fetched": 12})));
        assert_eq!(job.execution_history.len(), 1);
        assert_eq!(job.execution_history[0].attempt, 1);
    }

    #[test]
    fn test_failed_transition_captures_error_and_no_completed_at() {
        let mut job = pending_job();
        job.retry_count = 2;
        job.start(at(2_000)).unwrap();

        let entry = job
            .transition(
                JobStatus::Failed,
                Some(json!({"error": "401 from api.github.com"})),
                at(2_500),
            )
            .unwrap()
            .clone();

        assert_eq!(entry.attempt, 3);
        assert_eq!(entry.error.as_deref(), Some("401 from api.github.com"));
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut job = pending_job();
        job.start(at(2_000)).unwrap();
        job.transition(JobStatus::Completed, None, at(3_000)).unwrap();

        let err = job.transition(JobStatus::Running, None, at(4_000));
        assert!(matches!(err, Err(DomainError::InvalidStateTransition { .. })));
        assert!(job.start(at(4_000)).is_err());
        assert_eq!(job.execution_history.len(), 1);
    }

    #[test]
    fn test_updated_at_never_before_created_at() {
        let mut job = pending_job();
        job.transition(JobStatus::Cancelled, None, at(10)).unwrap();
        assert_eq!(job.updated_at, job.created_at);
    }

    #[test]
    fn test_from_spec_validation_names_field() {
        let spec = JobSpec::new(JobType::CacheWarm, "  ", Priority::Low);
        let err = Job::from_spec(spec, "fallback".into(), at(0)).unwrap_err();
        assert!(matches!(err, DomainError::ValidationError { field: "name", .. }));

        let mut spec = JobSpec::new(JobType::CacheWarm, "warm", Priority::Low);
        spec.priority = 7;
        let err = Job::from_spec(spec, "fallback".into(), at(0)).unwrap_err();
        assert!(matches!(err, DomainError::ValidationError { field: "priority", .. }));

        let mut spec = JobSpec::new(JobType::CacheWarm, "warm", Priority::Low);
        spec.job_type = "reindex".into();
        let err = Job::from_spec(spec, "fallback".into(), at(0)).unwrap_err();
        assert!(matches!(err, DomainError::ValidationError { field: "type", .. }));

        let spec = JobSpec::new(JobType::CacheWarm, "warm", Priority::Low).with_id("");
        let err = Job::from_spec(spec, "fallback".into(), at(0)).unwrap_err();
        assert!(matches!(err, DomainError::ValidationError { field: "id", .. }));
    }

    #[test]
    fn test_from_spec_assigns_fallback_id() {
        let spec = JobSpec::new(JobType::CacheWarm, "warm", Priority::Low)
            .with_target(Tool::Jira, "/rest/api/3/search");
        let job = Job::from_spec(spec, "generated-id".into(), at(5)).unwrap();
        assert_eq!(job.id, "generated-id");
        assert_eq!(job.tool, Some(Tool::Jira));
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn test_job_spec_deserializes_camel_case() {
        let spec: JobSpec = serde_json::from_value(json!({
            "type": "data-refresh",
            "name": "Refresh issues",
            "priority": 3,
            "tool": "gitlab",
            "retryCount": 1
        }))
        .unwrap();
        assert_eq!(spec.job_type, "data-refresh");
        assert_eq!(spec.tool, Some(Tool::GitLab));
        assert_eq!(spec.retry_count, 1);
    }
}
