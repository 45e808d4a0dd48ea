// Schema binding for the relational engine

use devdash_core::port::{Dialect, SchemaBinding, TableDef};

pub static SCHEMA: SchemaBinding = SchemaBinding {
    id: "devdash-relational",
    dialect: Dialect::Postgres,
    version: 2,
    tables: &[
        TableDef {
            name: "jobs",
            columns: &[
                "id",
                "job_type",
                "name",
                "priority",
                "status",
                "payload",
                "result",
                "tool",
                "endpoint",
                "created_at",
                "updated_at",
                "started_at",
                "completed_at",
                "retry_count",
                "execution_history",
            ],
        },
        TableDef {
            name: "rate_limits",
            columns: &[
                "tool",
                "endpoint",
                "limit_total",
                "remaining",
                "reset_at",
                "updated_at",
            ],
        },
        TableDef {
            name: "tool_configs",
            columns: &["tool", "enabled", "settings", "updated_at"],
        },
        TableDef {
            name: "oauth_tokens",
            columns: &[
                "user_id",
                "provider",
                "access_token",
                "access_token_iv",
                "refresh_token",
                "refresh_token_iv",
                "token_type",
                "scope",
                "expires_at",
                "created_at",
                "updated_at",
            ],
        },
        TableDef {
            name: "sessions",
            columns: &[
                "id",
                "user_id",
                "data",
                "expires_at",
                "created_at",
                "updated_at",
            ],
        },
        TableDef {
            name: "app_state",
            columns: &["key", "value", "updated_at"],
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::live_pool;

    #[test]
    fn test_identity_differs_from_any_sqlite_binding() {
        assert_eq!(SCHEMA.dialect, Dialect::Postgres);
        assert!(SCHEMA.is_same(&SCHEMA));
        assert!(SCHEMA.table("oauth_tokens").unwrap().has_column("access_token_iv"));
    }

    #[tokio::test]
    async fn test_binding_matches_migrations() {
        let Some(pool) = live_pool().await else {
            return;
        };

        for table in SCHEMA.tables {
            let columns: Vec<String> = sqlx::query_scalar(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position",
            )
            .bind(table.name)
            .fetch_all(&pool)
            .await
            .unwrap();
            let expected: Vec<String> = table.columns.iter().map(|c| c.to_string()).collect();
            assert_eq!(columns, expected, "table {}", table.name);
        }
    }
}
