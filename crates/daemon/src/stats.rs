// Periodic queue statistics log line

use devdash_core::application::{JobQueue, ShutdownToken};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub async fn report_loop(queue: Arc<JobQueue>, period: Duration, mut shutdown: ShutdownToken) {
    while shutdown.sleep(period).await {
        let stats = queue.get_stats().await;
        info!(
            pending = stats.pending,
            running = stats.running,
            completed = stats.completed,
            failed = stats.failed,
            cancelled = stats.cancelled,
            total = stats.total,
            average_execution_ms = stats.average_execution_ms,
            "Queue stats"
        );
    }
}
