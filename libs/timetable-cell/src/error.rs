use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimetableError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timetable entry not found: {0}")]
    NotFound(String),

    #[error("Timetable conflict: {0}")]
    Conflict(String),

    #[error("Timetable storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for TimetableError {
    fn from(err: anyhow::Error) -> Self {
        TimetableError::Storage(err.to_string())
    }
}

impl From<TimetableError> for AppError {
    fn from(err: TimetableError) -> Self {
        match err {
            TimetableError::Validation(msg) => AppError::ValidationError(msg),
            TimetableError::NotFound(msg) => AppError::NotFound(msg),
            TimetableError::Conflict(msg) => AppError::Conflict(msg),
            TimetableError::Storage(msg) => AppError::Database(msg),
        }
    }
}
