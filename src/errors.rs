use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("NOT_A_GROUP: {0}")]
    NotAGroup(String),
    #[error("CANNOT_NEST_GROUPS: {0}")]
    CannotNestGroups(String),
    #[error("CROSS_PROFILE_MOVE: {0}")]
    CrossProfileMove(String),
    #[error("NOT_IN_GROUP: {0}")]
    NotInGroup(String),
    #[error("INVALID_REORDER_SET: {0}")]
    InvalidReorderSet(String),
    #[error("TRANSACTION_CONFLICT: {0}")]
    TransactionConflict(String),
    #[error("VALIDATION: {0}")]
    Validation(String),
    #[error("CONFLICT: {0}")]
    Conflict(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code, the prefix of the rendered message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::NotAGroup(_) => "NOT_A_GROUP",
            Self::CannotNestGroups(_) => "CANNOT_NEST_GROUPS",
            Self::CrossProfileMove(_) => "CROSS_PROFILE_MOVE",
            Self::NotInGroup(_) => "NOT_IN_GROUP",
            Self::InvalidReorderSet(_) => "INVALID_REORDER_SET",
            Self::TransactionConflict(_) => "TRANSACTION_CONFLICT",
            Self::Validation(_) => "VALIDATION",
            Self::Conflict(_) => "CONFLICT",
            Self::Io(_) => "IO_FAILURE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the caller may re-issue the whole operation from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, _) = &value {
            match failure.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    return Self::TransactionConflict(value.to_string());
                }
                ErrorCode::ConstraintViolation
                    if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    return Self::Conflict(value.to_string());
                }
                _ => {}
            }
        }
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Validation(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
