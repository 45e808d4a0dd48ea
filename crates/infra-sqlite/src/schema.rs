// Schema binding for the legacy engine
//
// Column lists mirror migrations/*.sql; `test_binding_matches_migrations`
// keeps the two in step.

use devdash_core::port::{Dialect, SchemaBinding, TableDef};

pub static SCHEMA: SchemaBinding = SchemaBinding {
    id: "devdash-legacy",
    dialect: Dialect::Sqlite,
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
