// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod job_repository;
pub mod repositories;
pub mod schema;
pub mod time_provider;
pub mod token_cipher;

// Re-exports
pub use id_provider::IdProvider;
pub use job_repository::{JobRepository, RecordError, RecordResult, StatusPatch};
pub use repositories::{
    AppStateRepository, OAuthTokenRepository, RateLimitRepository, SessionRepository,
    ToolConfigRepository,
};
pub use schema::{Dialect, SchemaBinding, TableDef};
pub use time_provider::TimeProvider;
pub use token_cipher::{SealedSecret, TokenCipher};
