// PostgreSQL OAuthTokenRepository
//
// Tokens are sealed by the TokenCipher before they reach the database.

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devdash_core::domain::{OAuthTokenRecord, Tool};
use devdash_core::error::Result;
use devdash_core::port::{OAuthTokenRepository, SealedSecret, TokenCipher};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct PgOAuthTokenRepository {
    pool: PgPool,
    cipher: Arc<dyn TokenCipher>,
}

impl PgOAuthTokenRepository {
    pub fn new(pool: PgPool, cipher: Arc<dyn TokenCipher>) -> Self {
        Self { pool, cipher }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    user_id: String,
    access_token: String,
    access_token_iv: String,
    refresh_token: Option<String>,
    refresh_token_iv: Option<String>,
    token_type: String,
    scope: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TokenRow {
    fn open(self, provider: Tool, cipher: &dyn TokenCipher) -> Result<OAuthTokenRecord> {
        let access_token = cipher.decrypt(&SealedSecret {
            ciphertext: self.access_token,
            iv: self.access_token_iv,
        })?;
        let refresh_token = match (self.refresh_token, self.refresh_token_iv) {
            (Some(ciphertext), Some(iv)) => Some(cipher.decrypt(&SealedSecret { ciphertext, iv })?),
            _ => None,
        };

        Ok(OAuthTokenRecord {
            user_id: self.user_id,
            provider,
            access_token,
            refresh_token,
            token_type: self.token_type,
            scope: self.scope,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl OAuthTokenRepository for PgOAuthTokenRepository {
    async fn save(&self, record: &OAuthTokenRecord) -> Result<()> {
        let access = self.cipher.encrypt(&record.access_token)?;
        let refresh = record
            .refresh_token
            .as_deref()
            .map(|token| self.cipher.encrypt(token))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO oauth_tokens (
                user_id, provider, access_token, access_token_iv,
                refresh_token, refresh_token_iv, token_type, scope,
                expires_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id, provider) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                access_token_iv = EXCLUDED.access_token_iv,
                refresh_token = EXCLUDED.refresh_token,
                refresh_token_iv = EXCLUDED.refresh_token_iv,
                token_type = EXCLUDED.token_type,
                scope = EXCLUDED.scope,
                expires_at = EXCLUDED.expires_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.user_id)
        .bind(record.provider.as_str())
        .bind(&access.ciphertext)
        .bind(&access.iv)
        .bind(refresh.as_ref().map(|s| s.ciphertext.as_str()))
        .bind(refresh.as_ref().map(|s| s.iv.as_str()))
        .bind(&record.token_type)
        .bind(&record.scope)
        .bind(record.expires_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(user_id = %record.user_id, provider = %record.provider, "OAuth token stored");
        Ok(())
    }

    async fn get(&self, user_id: &str, provider: Tool) -> Result<Option<OAuthTokenRecord>> {
        let row: Option<TokenRow> = sqlx::query_as(
            r#"
            SELECT user_id, access_token, access_token_iv, refresh_token, refresh_token_iv,
                   token_type, scope, expires_at, created_at, updated_at
            FROM oauth_tokens WHERE user_id = $1 AND provider = $2
            "#,
        )
        .bind(user_id)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.open(provider, self.cipher.as_ref()))
            .transpose()
            .inspect_err(|e| {
                warn!(user_id = %user_id, provider = %provider, error = %e, "Stored OAuth token could not be opened");
            })
    }

    async fn delete(&self, user_id: &str, provider: Tool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM oauth_tokens WHERE user_id = $1 AND provider = $2")
            .bind(user_id)
            .bind(provider.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_providers(&self, user_id: &str) -> Result<Vec<Tool>> {
        let providers: Vec<String> = sqlx::query_scalar(
            "SELECT provider FROM oauth_tokens WHERE user_id = $1 ORDER BY provider COLLATE \"C\"",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(providers
            .iter()
            .filter_map(|raw| raw.parse::<Tool>().ok())
            .collect())
    }
}
