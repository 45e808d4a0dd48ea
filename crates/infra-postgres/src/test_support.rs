// Live database access for tests
//
// Tests that need a server return early unless DEVDASH_TEST_POSTGRES_URL is set.

use crate::{create_pool, run_migrations};
use sqlx::PgPool;

pub const TEST_URL_VAR: &str = "DEVDASH_TEST_POSTGRES_URL";

pub async fn live_pool() -> Option<PgPool> {
    let url = std::env::var(TEST_URL_VAR).ok()?;
    let pool = create_pool(&url, 2).await.unwrap();
    run_migrations(&pool).await.unwrap();
    Some(pool)
}

/// Unique key so tests sharing one database do not collide
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}
