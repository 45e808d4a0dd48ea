// Migration Runner

use crate::error::map_sqlx_error;
use devdash_core::error::Result;
use sqlx::PgPool;
use tracing::info;

const MIGRATIONS: &[(i32, &str, &str)] = &[
    (1, "jobs", include_str!("../migrations/001_jobs.sql")),
    (
        2,
        "sibling tables",
        include_str!("../migrations/002_sibling_tables.sql"),
    ),
];

pub async fn schema_version(pool: &PgPool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = 'schema_version')",
    )
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(map_sqlx_error)?;
    Ok(version.unwrap_or(0))
}

/// Run database migrations (idempotent)
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let current_version = schema_version(pool).await?;
    info!(current_version, "Running relational engine migrations");

    for (version, label, sql) in MIGRATIONS {
        if current_version < *version {
            info!(version, label, "Applying migration");
            apply_migration(pool, sql).await?;
        }
    }

    Ok(())
}

async fn apply_migration(pool: &PgPool, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    for statement in sql.split(';') {
        let clean_statement: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        if !clean_statement.is_empty() {
            sqlx::query(&clean_statement)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }
    }

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}
