// sqlx::Error -> AppError for the relational engine

use devdash_core::error::AppError;

/// Convert sqlx::Error to AppError with structured information
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // https://www.postgresql.org/docs/current/errcodes-appendix.html
            Some("23505") => AppError::DuplicateKey(db_err.message().to_string()),
            Some("40001") | Some("40P01") => AppError::Database(format!(
                "Transaction conflict: {}",
                db_err.message()
            )),
            Some(code) => {
                AppError::Database(format!("Database error [{}]: {}", code, db_err.message()))
            }
            None => AppError::Database(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        sqlx::Error::PoolTimedOut => {
            AppError::Database("Timed out waiting for a database connection".to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}

/// Like [`map_sqlx_error`], but a unique violation names the offending key
pub(crate) fn map_insert_error(key: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |err| match map_sqlx_error(err) {
        AppError::DuplicateKey(_) => AppError::DuplicateKey(key.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            AppError::Database(_)
        ));
        let err = map_insert_error("job-1")(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::Database(msg) if msg.contains("Timed out")));
    }
}
