// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod queue;
pub mod records;

// Re-exports
pub use error::DomainError;
pub use job::{ExecutionRecord, Job, JobId, JobSpec, JobStatus, JobType, Priority};
pub use queue::PriorityQueue;
pub use records::{
    AppStateRecord, OAuthTokenRecord, RateLimitRecord, SessionRecord, Tool, ToolConfigRecord,
};
