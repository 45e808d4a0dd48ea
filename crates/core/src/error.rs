// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error on `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("Already exists: {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Stable error classification for callers that translate errors into
/// transport-level responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    DuplicateKey,
    NotFound,
    InvalidState,
    PersistenceFailure,
    Crypto,
    Config,
    Internal,
}

impl ErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::DuplicateKey => "duplicate_key",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::Crypto => "crypto",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        }
    }

    /// True for errors the caller caused and can fix (4xx territory).
    pub const fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::Validation
                | ErrorKind::DuplicateKey
                | ErrorKind::NotFound
                | ErrorKind::InvalidState
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::DuplicateKey(_) => ErrorKind::DuplicateKey,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::InvalidState(_) => ErrorKind::InvalidState,
            AppError::Database(_) => ErrorKind::PersistenceFailure,
            AppError::Serialization(_) => ErrorKind::PersistenceFailure,
            AppError::Crypto(_) => ErrorKind::Crypto,
            AppError::Config(_) => ErrorKind::Config,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

// Domain errors surface to callers as validation or state failures
impl From<crate::domain::DomainError> for AppError {
    fn from(err: crate::domain::DomainError) -> Self {
        use crate::domain::DomainError;

        match err {
            DomainError::ValidationError { field, message } => AppError::validation(field, message),
            DomainError::UnknownVariant { kind, value } => {
                AppError::validation(kind, format!("unknown {}: {}", kind, value))
            }
            e @ DomainError::InvalidStateTransition { .. } => AppError::InvalidState(e.to_string()),
        }
    }
}

// Note: sqlx::Error conversion is handled in each infra crate
// by a map_sqlx_error helper (orphan rule)
