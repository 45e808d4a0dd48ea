// Devdash Infrastructure - SQLite Adapter (legacy engine)
// Implements: JobRepository and the sibling repositories over epoch-ms / JSON-text columns

mod app_state_repository;
mod codec;
mod connection;
mod job_repository;
mod migration;
mod oauth_token_repository;
mod rate_limit_repository;
mod schema;
mod session_repository;
mod tool_config_repository;

pub use app_state_repository::SqliteAppStateRepository;
pub use codec::map_sqlx_error;
pub use connection::create_pool;
pub use job_repository::SqliteJobRepository;
pub use migration::run_migrations;
pub use oauth_token_repository::SqliteOAuthTokenRepository;
pub use rate_limit_repository::SqliteRateLimitRepository;
pub use schema::SCHEMA;
pub use session_repository::SqliteSessionRepository;
pub use tool_config_repository::SqliteToolConfigRepository;

// Note: sqlx::Error conversion is handled by wrapping in helper functions
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
