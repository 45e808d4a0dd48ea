// Sibling storage records (rate limits, tool config, OAuth tokens, sessions, app state)

use super::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Integrated vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    GitHub,
    GitLab,
    Jira,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::GitHub, Tool::GitLab, Tool::Jira];

    pub const fn as_str(self) -> &'static str {
        match self {
            Tool::GitHub => "github",
            Tool::GitLab => "gitlab",
            Tool::Jira => "jira",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Tool::GitHub),
            "gitlab" => Ok(Tool::GitLab),
            "jira" => Ok(Tool::Jira),
            other => Err(DomainError::UnknownVariant {
                kind: "tool",
                value: other.to_string(),
            }),
        }
    }
}

/// Last known quota for one vendor endpoint.
///
/// `endpoint` is empty for tool-wide limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub tool: Tool,
    pub endpoint: String,
    pub limit: i64,
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RateLimitRecord {
    pub fn is_exhausted(&self, now: DateTime<Utc>) -> bool {
        self.remaining <= 0 && now < self.reset_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfigRecord {
    pub tool: Tool,
    pub enabled: bool,
    pub settings: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Decrypted OAuth credentials for one user and provider.
///
/// Token strings only exist in plaintext in memory; repositories store them
/// sealed by the token cipher.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthTokenRecord {
    pub user_id: String,
    pub provider: Tool,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub scope: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthTokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

// Secrets stay out of Debug output (and therefore out of logs)
impl std::fmt::Debug for OAuthTokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenRecord")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub data: serde_json::Value,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppStateRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
