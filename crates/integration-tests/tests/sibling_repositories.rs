//! Contract suite for the repositories that share the job store's engine

mod common;

use chrono::{DateTime, Duration, Utc};
use devdash_core::domain::{
    OAuthTokenRecord, RateLimitRecord, SessionRecord, Tool, ToolConfigRecord,
};
use devdash_core::port::TimeProvider;
use devdash_core::AppError;
use devdash_storage::{Pool, Repositories};
use serde_json::json;

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

fn now() -> DateTime<Utc> {
    common::clock().now()
}

async fn rate_limits(repos: &Repositories) {
    let now = now();
    let endpoint = unique("/search/issues");
    let mut record = RateLimitRecord {
        tool: Tool::GitHub,
        endpoint: endpoint.clone(),
        limit: 30,
        remaining: 30,
        reset_at: now + Duration::minutes(1),
        updated_at: now,
    };
    repos.rate_limits.upsert(&record).await.unwrap();

    record.remaining = 0;
    record.updated_at = now + Duration::seconds(5);
    repos.rate_limits.upsert(&record).await.unwrap();

    let stored = repos
        .rate_limits
        .get(Tool::GitHub, &endpoint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, record);
    assert!(stored.is_exhausted(now));
    assert!(repos.rate_limits.get(Tool::Jira, &endpoint).await.unwrap().is_none());

    let listed = repos.rate_limits.list_for_tool(Tool::GitHub).await.unwrap();
    assert!(listed.iter().any(|r| r.endpoint == endpoint));

    repos
        .rate_limits
        .delete_expired(now + Duration::minutes(2))
        .await
        .unwrap();
    assert!(repos
        .rate_limits
        .get(Tool::GitHub, &endpoint)
        .await
        .unwrap()
        .is_none());
}

async fn tool_configs(repos: &Repositories) {
    let now = now();
    let settings = json!({"org": unique("acme"), "repos": ["api", "web"]});
    let record = ToolConfigRecord {
        tool: Tool::GitLab,
        enabled: true,
        settings: settings.clone(),
        updated_at: now,
    };
    repos.tool_configs.upsert(&record).await.unwrap();
    assert_eq!(
        repos.tool_configs.get(Tool::GitLab).await.unwrap(),
        Some(record)
    );

    let later = now + Duration::minutes(1);
    assert!(repos
        .tool_configs
        .set_enabled(Tool::GitLab, false, later)
        .await
        .unwrap());
    let stored = repos.tool_configs.get(Tool::GitLab).await.unwrap().unwrap();
    assert!(!stored.enabled);
    assert_eq!(stored.settings, settings);
    assert_eq!(stored.updated_at, later);

    let listed = repos.tool_configs.list().await.unwrap();
    assert!(listed.iter().any(|c| c.tool == Tool::GitLab));
}

async fn oauth_tokens(repos: &Repositories) -> String {
    let now = now();
    let user = unique("user");
    let record = OAuthTokenRecord {
        user_id: user.clone(),
        provider: Tool::GitHub,
        access_token: "gho_access_plaintext".to_string(),
        refresh_token: Some("ghr_refresh_plaintext".to_string()),
        token_type: "bearer".to_string(),
        scope: Some("repo read:org".to_string()),
        expires_at: Some(now + Duration::hours(8)),
        created_at: now,
        updated_at: now,
    };
    repos.oauth_tokens.save(&record).await.unwrap();

    let jira = OAuthTokenRecord {
        provider: Tool::Jira,
        refresh_token: None,
        scope: None,
        expires_at: None,
        ..record.clone()
    };
    repos.oauth_tokens.save(&jira).await.unwrap();

    assert_eq!(
        repos.oauth_tokens.get(&user, Tool::GitHub).await.unwrap(),
        Some(record)
    );
    assert_eq!(
        repos.oauth_tokens.list_providers(&user).await.unwrap(),
        vec![Tool::GitHub, Tool::Jira]
    );

    assert!(repos.oauth_tokens.delete(&user, Tool::Jira).await.unwrap());
    assert!(!repos.oauth_tokens.delete(&user, Tool::Jira).await.unwrap());
    assert_eq!(
        repos.oauth_tokens.list_providers(&user).await.unwrap(),
        vec![Tool::GitHub]
    );
    user
}

async fn sessions(repos: &Repositories) {
    let now = now();
    let user = unique("user");
    let live = SessionRecord {
        id: unique("sess"),
        user_id: user.clone(),
        data: json!({"theme": "dark"}),
        expires_at: now + Duration::hours(1),
        created_at: now,
        updated_at: now,
    };
    let stale = SessionRecord {
        id: unique("sess"),
        expires_at: now - Duration::minutes(1),
        ..live.clone()
    };
    repos.sessions.create(&live).await.unwrap();
    repos.sessions.create(&stale).await.unwrap();

    let err = repos.sessions.create(&live).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateKey(ref id) if *id == live.id));

    assert_eq!(repos.sessions.get(&live.id, now).await.unwrap(), Some(live.clone()));
    assert!(repos.sessions.get(&stale.id, now).await.unwrap().is_none());

    let extended = now + Duration::hours(2);
    assert!(repos.sessions.touch(&live.id, extended, now).await.unwrap());
    assert!(!repos.sessions.touch(&stale.id, extended, now).await.unwrap());
    let touched = repos.sessions.get(&live.id, now).await.unwrap().unwrap();
    assert_eq!(touched.expires_at, extended);

    assert!(repos.sessions.delete_expired(now).await.unwrap() >= 1);
    assert_eq!(repos.sessions.delete_for_user(&user).await.unwrap(), 1);
    assert!(!repos.sessions.delete(&live.id).await.unwrap());
}

async fn app_state(repos: &Repositories) {
    let now = now();
    let prefix = unique("sync");
    let cursor = format!("{}:github", prefix);
    let other = format!("{}:jira", prefix);

    repos.app_state.set(&cursor, &json!({"since": 1}), now).await.unwrap();
    repos.app_state.set(&other, &json!(false), now).await.unwrap();
    repos
        .app_state
        .set(&cursor, &json!({"since": 2}), now + Duration::seconds(1))
        .await
        .unwrap();

    let stored = repos.app_state.get(&cursor).await.unwrap().unwrap();
    assert_eq!(stored.value, json!({"since": 2}));
    assert_eq!(stored.updated_at, now + Duration::seconds(1));

    let keys: Vec<String> = repos
        .app_state
        .list(&prefix)
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.key)
        .collect();
    assert_eq!(keys, vec![cursor.clone(), other.clone()]);

    assert!(repos.app_state.delete(&other).await.unwrap());
    assert!(repos.app_state.get(&other).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Legacy engine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sqlite_sibling_contract() {
    let factory = common::sqlite_factory().await;
    let repos = factory.repositories().unwrap();

    rate_limits(repos).await;
    tool_configs(repos).await;
    sessions(repos).await;
    app_state(repos).await;
    let user = oauth_tokens(repos).await;

    // Tokens are sealed at rest
    let Pool::Sqlite(pool) = factory.handle().pool() else {
        unreachable!("sqlite url yields a sqlite pool");
    };
    let stored: String =
        sqlx::query_scalar("SELECT access_token FROM oauth_tokens WHERE user_id = ?")
            .bind(&user)
            .fetch_one(pool)
            .await
            .unwrap();
    assert_ne!(stored, "gho_access_plaintext");
    assert!(!stored.contains("plaintext"));
}

// ---------------------------------------------------------------------------
// Relational engine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_postgres_sibling_contract() {
    let Some(factory) = common::postgres_factory().await else {
        return;
    };
    let repos = factory.repositories().unwrap();

    rate_limits(repos).await;
    tool_configs(repos).await;
    sessions(repos).await;
    app_state(repos).await;
    let user = oauth_tokens(repos).await;

    let Pool::Postgres(pool) = factory.handle().pool() else {
        unreachable!("postgres url yields a postgres pool");
    };
    let stored: String =
        sqlx::query_scalar("SELECT access_token FROM oauth_tokens WHERE user_id = $1")
            .bind(&user)
            .fetch_one(pool)
            .await
            .unwrap();
    assert_ne!(stored, "gho_access_plaintext");
}
