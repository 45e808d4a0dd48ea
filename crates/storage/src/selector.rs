// Engine detection from the handle's schema binding

use crate::handle::{DatabaseHandle, Pool};
use devdash_core::error::AppError;
use devdash_core::port::SchemaBinding;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// Embedded SQLite schema (epoch-ms, JSON text)
    Legacy,
    /// PostgreSQL schema (TIMESTAMPTZ, JSONB)
    Relational,
    Unrecognized,
}

impl Engine {
    pub const fn as_str(self) -> &'static str {
        match self {
            Engine::Legacy => "legacy",
            Engine::Relational => "relational",
            Engine::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the operator's engine hint
impl FromStr for Engine {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "sqlite" => Ok(Engine::Legacy),
            "relational" | "postgres" | "postgresql" => Ok(Engine::Relational),
            other => Err(AppError::Config(format!("unknown engine `{}`", other))),
        }
    }
}

/// Decide which engine the handle is bound to.
///
/// Never fails: a handle whose identity cannot be read counts as "not this
/// engine", and anything matching neither binding is `Unrecognized`.
pub fn detect_engine(handle: &DatabaseHandle) -> Engine {
    let relational = matches!(handle.pool(), Pool::Postgres(_))
        && is_bound_to(handle, &devdash_infra_postgres::SCHEMA);
    if relational {
        return Engine::Relational;
    }

    let legacy = matches!(handle.pool(), Pool::Sqlite(_))
        && is_bound_to(handle, &devdash_infra_sqlite::SCHEMA);
    if legacy {
        return Engine::Legacy;
    }

    Engine::Unrecognized
}

fn is_bound_to(handle: &DatabaseHandle, expected: &SchemaBinding) -> bool {
    match handle.schema_identity() {
        Ok(binding) => binding.is_same(expected),
        Err(e) => {
            debug!(error = %e, expected = expected.id, "Schema identity unavailable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn sqlite_pool() -> Pool {
        Pool::Sqlite(
            devdash_infra_sqlite::create_pool("sqlite::memory:", 1)
                .await
                .unwrap(),
        )
    }

    // Lazy pool: never opens a connection
    fn postgres_pool() -> Pool {
        Pool::Postgres(
            PgPoolOptions::new()
                .connect_lazy("postgres://devdash@localhost/devdash")
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_detects_bound_engines() {
        let legacy = DatabaseHandle::detached(sqlite_pool().await)
            .with_schema(&devdash_infra_sqlite::SCHEMA);
        assert_eq!(detect_engine(&legacy), Engine::Legacy);

        let relational = DatabaseHandle::detached(postgres_pool())
            .with_schema(&devdash_infra_postgres::SCHEMA);
        assert_eq!(detect_engine(&relational), Engine::Relational);
    }

    #[tokio::test]
    async fn test_unbound_or_mismatched_is_unrecognized() {
        let detached = DatabaseHandle::detached(sqlite_pool().await);
        assert_eq!(detect_engine(&detached), Engine::Unrecognized);

        // Binding and pool disagree
        let crossed = DatabaseHandle::detached(sqlite_pool().await)
            .with_schema(&devdash_infra_postgres::SCHEMA);
        assert_eq!(detect_engine(&crossed), Engine::Unrecognized);
    }

    #[test]
    fn test_engine_hint_parsing() {
        assert_eq!("Legacy".parse::<Engine>().unwrap(), Engine::Legacy);
        assert_eq!("postgres".parse::<Engine>().unwrap(), Engine::Relational);
        assert!("mongo".parse::<Engine>().is_err());
    }
}
