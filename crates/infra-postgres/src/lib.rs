// Devdash Infrastructure - PostgreSQL Adapter (relational engine)
// Implements: JobRepository and the sibling repositories over TIMESTAMPTZ / JSONB columns

mod app_state_repository;
mod connection;
mod error;
mod job_repository;
mod migration;
mod oauth_token_repository;
mod rate_limit_repository;
mod schema;
mod session_repository;
mod tool_config_repository;

#[cfg(test)]
mod test_support;

pub use app_state_repository::PgAppStateRepository;
pub use connection::create_pool;
pub use error::map_sqlx_error;
pub use job_repository::PgJobRepository;
pub use migration::run_migrations;
pub use oauth_token_repository::PgOAuthTokenRepository;
pub use rate_limit_repository::PgRateLimitRepository;
pub use schema::SCHEMA;
pub use session_repository::PgSessionRepository;
pub use tool_config_repository::PgToolConfigRepository;
