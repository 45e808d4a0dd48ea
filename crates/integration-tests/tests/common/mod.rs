//! Shared setup for the cross-crate tests
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use devdash_core::application::JobQueue;
use devdash_core::port::id_provider::mocks::SequentialIdProvider;
use devdash_core::port::time_provider::mocks::ManualClock;
use devdash_core::port::TokenCipher;
use devdash_infra_system::AesGcmTokenCipher;
use devdash_storage::{DatabaseHandle, Repositories, RepositoryFactory};

/// Live relational tests run only when this points at a scratch database
pub const POSTGRES_URL_VAR: &str = "DEVDASH_TEST_POSTGRES_URL";

/// 2024-01-01T00:00:00Z
pub const START_MILLIS: i64 = 1_704_067_200_000;

pub fn cipher() -> Arc<dyn TokenCipher> {
    let key = AesGcmTokenCipher::generate_key();
    Arc::new(AesGcmTokenCipher::from_base64_key(&key).unwrap())
}

pub async fn sqlite_factory() -> RepositoryFactory {
    let handle = DatabaseHandle::connect("sqlite::memory:", 1).await.unwrap();
    RepositoryFactory::new(handle, cipher())
}

pub async fn postgres_factory() -> Option<RepositoryFactory> {
    let url = std::env::var(POSTGRES_URL_VAR).ok()?;
    let handle = DatabaseHandle::connect(&url, 2).await.unwrap();
    Some(RepositoryFactory::new(handle, cipher()))
}

/// Queue over `repos` with a controllable clock and predictable ids
pub fn queue_for(repos: &Repositories, clock: Arc<ManualClock>) -> Arc<JobQueue> {
    let id_prefix = format!("job-{}", uuid::Uuid::new_v4().simple());
    Arc::new(JobQueue::new(
        repos.jobs.clone(),
        Arc::new(SequentialIdProvider::new(id_prefix)),
        clock,
    ))
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_millis(START_MILLIS))
}

/// Fresh on-disk database file, removed by the caller
pub fn scratch_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("devdash-it-{}.db", uuid::Uuid::new_v4()))
}

pub fn sqlite_url(path: &std::path::Path) -> String {
    format!("sqlite://{}", path.display())
}

pub fn remove_db_files(path: &std::path::Path) {
    let _ = std::fs::remove_file(path);
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        let _ = std::fs::remove_file(PathBuf::from(side));
    }
}
