// Column codecs for the legacy engine
//
// Instants are stored as epoch milliseconds, structured values as JSON text.

use chrono::{DateTime, Utc};
use devdash_core::error::AppError;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Convert sqlx::Error to AppError with structured information
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => {
                        // UNIQUE / PRIMARY KEY constraint failed
                        AppError::DuplicateKey(db_err.message().to_string())
                    }
                    "5" => AppError::Database(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        // Connection, pool, protocol errors
        _ => AppError::Database(err.to_string()),
    }
}

/// Like [`map_sqlx_error`], but a constraint violation names the offending key
pub(crate) fn map_insert_error(key: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |err| match map_sqlx_error(err) {
        AppError::DuplicateKey(_) => AppError::DuplicateKey(key.to_string()),
        other => other,
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Required instant column
pub(crate) fn require_millis(column: &str, millis: i64) -> Result<DateTime<Utc>, AppError> {
    from_millis(millis)
        .ok_or_else(|| AppError::Database(format!("{} out of range: {}", column, millis)))
}

/// Decode an optional JSON text column; an unparsable value is logged and dropped
pub(crate) fn lenient_json<T: DeserializeOwned>(
    owner: &str,
    column: &str,
    raw: Option<&str>,
) -> Option<T> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(owner = %owner, column, error = %e, "Discarding unparsable JSON column");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_round_trip() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(from_millis(to_millis(at)), Some(at));
        assert!(require_millis("created_at", i64::MAX).is_err());
    }

    #[test]
    fn test_lenient_json() {
        let ok: Option<serde_json::Value> = lenient_json("job-1", "result", Some(r#"{"a":1}"#));
        assert_eq!(ok, Some(serde_json::json!({"a": 1})));

        let bad: Option<serde_json::Value> = lenient_json("job-1", "result", Some("{oops"));
        assert!(bad.is_none());

        let absent: Option<serde_json::Value> = lenient_json("job-1", "result", None);
        assert!(absent.is_none());
    }
}
