use thiserror::Error;

use shared_models::error::AppError;
use slot_cell::SlotError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Appointment cannot change state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error("Appointment storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        AppointmentError::Storage(err.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::NotFound(msg) => AppError::NotFound(msg),
            AppointmentError::InvalidState(msg) => AppError::Conflict(msg),
            AppointmentError::Slot(slot) => slot.into(),
            AppointmentError::Storage(msg) => AppError::Database(msg),
        }
    }
}
