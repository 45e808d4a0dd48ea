// Sibling repository ports
//
// Same contract shape as JobRepository: one implementation per storage
// engine, normalized records in and out.

use crate::domain::{
    AppStateRecord, OAuthTokenRecord, RateLimitRecord, SessionRecord, Tool, ToolConfigRecord,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Vendor API quota snapshots
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Insert or replace the quota for `(tool, endpoint)`
    async fn upsert(&self, record: &RateLimitRecord) -> Result<()>;

    async fn get(&self, tool: Tool, endpoint: &str) -> Result<Option<RateLimitRecord>>;

    async fn list_for_tool(&self, tool: Tool) -> Result<Vec<RateLimitRecord>>;

    /// Delete snapshots whose window reset before `before`
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64>;
}

/// Per-integration settings
#[async_trait]
pub trait ToolConfigRepository: Send + Sync {
    async fn upsert(&self, record: &ToolConfigRecord) -> Result<()>;

    async fn get(&self, tool: Tool) -> Result<Option<ToolConfigRecord>>;

    async fn list(&self) -> Result<Vec<ToolConfigRecord>>;

    /// Returns `false` when the tool has no stored configuration
    async fn set_enabled(&self, tool: Tool, enabled: bool, now: DateTime<Utc>) -> Result<bool>;
}

/// OAuth credentials, encrypted at rest
#[async_trait]
pub trait OAuthTokenRepository: Send + Sync {
    /// Insert or replace the token pair for `(user_id, provider)`
    async fn save(&self, record: &OAuthTokenRecord) -> Result<()>;

    async fn get(&self, user_id: &str, provider: Tool) -> Result<Option<OAuthTokenRecord>>;

    async fn delete(&self, user_id: &str, provider: Tool) -> Result<bool>;

    /// Providers the user has connected
    async fn list_providers(&self, user_id: &str) -> Result<Vec<Tool>>;
}

/// Login sessions
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Fails with `AppError::DuplicateKey` if the session id exists
    async fn create(&self, record: &SessionRecord) -> Result<()>;

    /// Expired sessions are treated as absent
    async fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Option<SessionRecord>>;

    /// Extend a live session. Returns `false` if unknown.
    async fn touch(&self, id: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>)
        -> Result<bool>;

    async fn delete(&self, id: &str) -> Result<bool>;

    async fn delete_for_user(&self, user_id: &str) -> Result<u64>;

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Small key/value store for dashboard state (sync cursors, feature toggles)
#[async_trait]
pub trait AppStateRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<AppStateRecord>>;

    async fn set(&self, key: &str, value: &serde_json::Value, now: DateTime<Utc>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<bool>;

    /// Records whose key starts with `prefix`, ordered by key
    async fn list(&self, prefix: &str) -> Result<Vec<AppStateRecord>>;
}
