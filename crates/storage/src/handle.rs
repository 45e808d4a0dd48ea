// Database handle: connection pool plus the schema binding it was wired to

use devdash_core::error::{AppError, Result};
use devdash_core::port::SchemaBinding;
use sqlx::{PgPool, SqlitePool};
use tracing::info;

#[derive(Debug, Clone)]
pub enum Pool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl Pool {
    pub fn kind(&self) -> &'static str {
        match self {
            Pool::Sqlite(_) => "sqlite",
            Pool::Postgres(_) => "postgres",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseHandle {
    pool: Pool,
    schema: Option<&'static SchemaBinding>,
}

impl DatabaseHandle {
    /// Open a pool for `database_url`, apply the engine's migrations and
    /// attach its schema binding.
    ///
    /// `postgres://` / `postgresql://` select the relational engine,
    /// `sqlite:` the legacy engine.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            let pool = devdash_infra_postgres::create_pool(database_url, max_connections).await?;
            devdash_infra_postgres::run_migrations(&pool).await?;
            info!(pool = "postgres", max_connections, "Database connected");
            Ok(Self::detached(Pool::Postgres(pool)).with_schema(&devdash_infra_postgres::SCHEMA))
        } else if database_url.starts_with("sqlite:") {
            let pool = devdash_infra_sqlite::create_pool(database_url, max_connections).await?;
            devdash_infra_sqlite::run_migrations(&pool).await?;
            info!(pool = "sqlite", max_connections, "Database connected");
            Ok(Self::detached(Pool::Sqlite(pool)).with_schema(&devdash_infra_sqlite::SCHEMA))
        } else {
            // Never echo the URL: it may carry credentials
            let scheme = database_url.split(':').next().unwrap_or_default();
            Err(AppError::Config(format!(
                "unsupported database url scheme `{}`",
                scheme
            )))
        }
    }

    /// Handle with no schema binding attached
    pub fn detached(pool: Pool) -> Self {
        Self { pool, schema: None }
    }

    pub fn with_schema(mut self, schema: &'static SchemaBinding) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Which table definitions this handle is wired to.
    ///
    /// Fails for a detached handle or a binding without identity or job table.
    pub fn schema_identity(&self) -> Result<&'static SchemaBinding> {
        let binding = self
            .schema
            .ok_or_else(|| AppError::Config("no schema binding attached".to_string()))?;

        if binding.id.is_empty() {
            return Err(AppError::Config("schema binding has no identity".to_string()));
        }
        if binding.table("jobs").is_none() {
            return Err(AppError::Config(format!(
                "schema binding `{}` defines no jobs table",
                binding.id
            )));
        }
        Ok(binding)
    }

    pub async fn close(&self) {
        match &self.pool {
            Pool::Sqlite(pool) => pool.close().await,
            Pool::Postgres(pool) => pool.close().await,
        }
    }
}
