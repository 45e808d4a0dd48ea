//! Devdash storage daemon - Main Entry Point
//!
//! Connects the configured database, selects the storage engine from the
//! handle's schema binding, recovers the job queue and runs maintenance
//! until Ctrl-C.

mod config;
mod logging;
mod stats;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::DaemonConfig;
use devdash_core::application::{
    shutdown_channel, JobQueue, MaintenanceConfig, MaintenanceScheduler, RecoveryService,
};
use devdash_core::port::id_provider::UuidProvider;
use devdash_core::port::time_provider::SystemTimeProvider;
use devdash_core::port::TokenCipher;
use devdash_infra_system::AesGcmTokenCipher;
use devdash_storage::{DatabaseHandle, RepositoryFactory};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::load()?;
    let _log_guard = logging::init_logging(&config.log_format, config.log_dir.as_deref())?;

    info!("Devdash storage daemon v{} starting...", VERSION);
    info!(config = ?config, "Configuration loaded");

    // 2. Database
    if let Some(path) = config.sqlite_path() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create database directory {}", parent.display()))?;
        }
    }
    let handle = DatabaseHandle::connect(&config.resolved_database_url(), config.max_connections)
        .await
        .context("Database initialization failed")?;

    // 3. Engine selection (once, for the life of the process)
    let cipher = build_cipher(&config)?;
    let factory = RepositoryFactory::new(handle, cipher);
    let repos = factory.repositories()?.clone();

    if let Some(hint) = config.engine_hint()? {
        if hint != repos.engine {
            warn!(
                configured = %hint,
                detected = %repos.engine,
                "Configured engine disagrees with the database handle; using detected engine"
            );
        }
    }

    // 4. Job queue + recovery
    let time_provider = Arc::new(SystemTimeProvider);
    let queue = Arc::new(JobQueue::new(
        repos.jobs.clone(),
        Arc::new(UuidProvider),
        time_provider.clone(),
    ));

    let recovery = RecoveryService::new(repos.jobs.clone(), queue.clone());
    match recovery.recover().await {
        Ok(report) => info!(
            restored = report.restored,
            requeued = report.requeued,
            skipped = report.skipped,
            stale_running = report.stale_running,
            "Recovery completed"
        ),
        Err(e) => error!(error = %e, "Recovery failed; starting with an empty queue"),
    }

    // 5. Background loops
    let (shutdown_tx, shutdown_token) = shutdown_channel();

    let maintenance = MaintenanceScheduler::new(
        repos.jobs.clone(),
        time_provider.clone(),
        MaintenanceConfig {
            retention_days: config.retention_days,
            interval_hours: config.cleanup_interval_hours,
        },
    )
    .with_sessions(repos.sessions.clone())
    .with_rate_limits(repos.rate_limits.clone());
    let maintenance_handle = tokio::spawn(maintenance.run(shutdown_token.clone()));

    let stats_handle = tokio::spawn(stats::report_loop(
        queue.clone(),
        Duration::from_secs(config.stats_interval_secs),
        shutdown_token,
    ));

    info!(engine = %repos.engine, pending = queue.len().await, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    shutdown_tx.shutdown();
    for (name, handle) in [("maintenance", maintenance_handle), ("stats", stats_handle)] {
        if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
            warn!(task = name, "Background task did not stop in time");
        }
    }
    factory.handle().close().await;

    info!("Shutdown complete.");
    Ok(())
}

fn build_cipher(config: &DaemonConfig) -> Result<Arc<dyn TokenCipher>> {
    let cipher = match &config.token_key {
        Some(key) => AesGcmTokenCipher::from_base64_key(key)?,
        None => {
            warn!("No token_key configured; using an ephemeral key. Stored OAuth tokens will not survive a restart");
            AesGcmTokenCipher::from_base64_key(&AesGcmTokenCipher::generate_key())?
        }
    };
    Ok(Arc::new(cipher))
}
