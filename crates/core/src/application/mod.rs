// Application Layer - Use Cases and Business Logic

pub mod job_queue;
pub mod maintenance;
pub mod recovery;
pub mod shutdown;

// Re-exports
pub use job_queue::{JobQueue, QueueStats};
pub use maintenance::{MaintenanceConfig, MaintenanceReport, MaintenanceScheduler};
pub use recovery::{RecoveryReport, RecoveryService};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
