// Repository factory
//
// Owned by the composition root. Detection runs once; the repositories built
// for the detected engine are published once and shared by every caller.

use crate::handle::{DatabaseHandle, Pool};
use crate::selector::{detect_engine, Engine};
use devdash_core::error::{AppError, Result};
use devdash_core::port::{
    AppStateRepository, JobRepository, OAuthTokenRepository, RateLimitRepository,
    SessionRepository, TokenCipher, ToolConfigRepository,
};
use devdash_infra_postgres::{
    PgAppStateRepository, PgJobRepository, PgOAuthTokenRepository, PgRateLimitRepository,
    PgSessionRepository, PgToolConfigRepository,
};
use devdash_infra_sqlite::{
    SqliteAppStateRepository, SqliteJobRepository, SqliteOAuthTokenRepository,
    SqliteRateLimitRepository, SqliteSessionRepository, SqliteToolConfigRepository,
};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Every repository for one engine
#[derive(Clone)]
pub struct Repositories {
    pub engine: Engine,
    pub jobs: Arc<dyn JobRepository>,
    pub rate_limits: Arc<dyn RateLimitRepository>,
    pub tool_configs: Arc<dyn ToolConfigRepository>,
    pub oauth_tokens: Arc<dyn OAuthTokenRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub app_state: Arc<dyn AppStateRepository>,
}

pub struct RepositoryFactory {
    handle: DatabaseHandle,
    cipher: Arc<dyn TokenCipher>,
    engine: OnceLock<Engine>,
    repositories: OnceLock<Repositories>,
}

impl RepositoryFactory {
    pub fn new(handle: DatabaseHandle, cipher: Arc<dyn TokenCipher>) -> Self {
        Self {
            handle,
            cipher,
            engine: OnceLock::new(),
            repositories: OnceLock::new(),
        }
    }

    pub fn handle(&self) -> &DatabaseHandle {
        &self.handle
    }

    /// Detected engine (first call inspects the handle, later calls reuse it)
    pub fn engine(&self) -> Engine {
        *self.engine.get_or_init(|| {
            let engine = detect_engine(&self.handle);
            match engine {
                Engine::Unrecognized => warn!(
                    pool = self.handle.pool().kind(),
                    "Database handle is not bound to a known schema"
                ),
                _ => info!(engine = %engine, "Storage engine selected"),
            }
            engine
        })
    }

    /// Repositories for the detected engine, constructed once.
    ///
    /// Concurrent first calls all observe the same instances.
    pub fn repositories(&self) -> Result<&Repositories> {
        let engine = self.engine();
        if engine == Engine::Unrecognized {
            return Err(AppError::Config(format!(
                "unrecognized storage engine for {} pool: no known schema binding attached",
                self.handle.pool().kind()
            )));
        }

        Ok(self.repositories.get_or_init(|| self.build(engine)))
    }

    pub fn jobs(&self) -> Result<Arc<dyn JobRepository>> {
        Ok(self.repositories()?.jobs.clone())
    }

    // Detection only returns a known engine when pool kind and binding agree,
    // so the pool variant alone picks the implementation.
    fn build(&self, engine: Engine) -> Repositories {
        match self.handle.pool() {
            Pool::Sqlite(pool) => Repositories {
                engine,
                jobs: Arc::new(SqliteJobRepository::new(pool.clone())),
                rate_limits: Arc::new(SqliteRateLimitRepository::new(pool.clone())),
                tool_configs: Arc::new(SqliteToolConfigRepository::new(pool.clone())),
                oauth_tokens: Arc::new(SqliteOAuthTokenRepository::new(
                    pool.clone(),
                    self.cipher.clone(),
                )),
                sessions: Arc::new(SqliteSessionRepository::new(pool.clone())),
                app_state: Arc::new(SqliteAppStateRepository::new(pool.clone())),
            },
            Pool::Postgres(pool) => Repositories {
                engine,
                jobs: Arc::new(PgJobRepository::new(pool.clone())),
                rate_limits: Arc::new(PgRateLimitRepository::new(pool.clone())),
                tool_configs: Arc::new(PgToolConfigRepository::new(pool.clone())),
                oauth_tokens: Arc::new(PgOAuthTokenRepository::new(
                    pool.clone(),
                    self.cipher.clone(),
                )),
                sessions: Arc::new(PgSessionRepository::new(pool.clone())),
                app_state: Arc::new(PgAppStateRepository::new(pool.clone())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devdash_core::port::token_cipher::mocks::ReversingCipher;
    use sqlx::postgres::PgPoolOptions;

    fn cipher() -> Arc<dyn TokenCipher> {
        Arc::new(ReversingCipher::default())
    }

    fn relational_handle() -> DatabaseHandle {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://devdash@localhost/devdash")
            .unwrap();
        DatabaseHandle::detached(Pool::Postgres(pool)).with_schema(&devdash_infra_postgres::SCHEMA)
    }

    #[tokio::test]
    async fn test_legacy_handle_yields_sqlite_repositories() {
        let handle = DatabaseHandle::connect("sqlite::memory:", 1).await.unwrap();
        let factory = RepositoryFactory::new(handle, cipher());

        let repos = factory.repositories().unwrap();
        assert_eq!(repos.engine, Engine::Legacy);
        assert_eq!(repos.jobs.engine_name(), "sqlite-legacy");
        assert!(Arc::ptr_eq(&repos.jobs, &factory.jobs().unwrap()));
    }

    #[tokio::test]
    async fn test_relational_selection_is_stable_under_races() {
        let factory = Arc::new(RepositoryFactory::new(relational_handle(), cipher()));

        let tasks = (0..16).map(|_| {
            let factory = factory.clone();
            tokio::spawn(async move { factory.jobs().unwrap() })
        });
        let results = futures::future::join_all(tasks).await;

        let first = factory.jobs().unwrap();
        assert_eq!(first.engine_name(), "postgres-relational");
        for result in results {
            assert!(Arc::ptr_eq(&first, &result.unwrap()));
        }
        assert_eq!(factory.engine(), Engine::Relational);
    }

    #[tokio::test]
    async fn test_unrecognized_handle_is_a_config_error() {
        let pool = devdash_infra_sqlite::create_pool("sqlite::memory:", 1)
            .await
            .unwrap();
        let factory = RepositoryFactory::new(DatabaseHandle::detached(Pool::Sqlite(pool)), cipher());

        assert_eq!(factory.engine(), Engine::Unrecognized);
        assert!(matches!(factory.repositories(), Err(AppError::Config(_))));
    }
}
