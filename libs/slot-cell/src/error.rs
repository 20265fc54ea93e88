use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use timetable_cell::TimetableError;

use crate::models::{SlotStatus, UnavailableReason};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlotError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot {slot_id} is unavailable: {reason}")]
    SlotUnavailable { slot_id: Uuid, reason: UnavailableReason },

    /// Occupancy change would leave `0..=max`.
    #[error("Slot {slot_id} occupancy {requested} is outside 0..={max}")]
    CapacityExceeded { slot_id: Uuid, requested: i64, max: u32 },

    #[error("Slot {slot_id} is {status} and cannot change occupancy")]
    SlotNotBookable { slot_id: Uuid, status: SlotStatus },

    #[error("Invalid slot state: {0}")]
    InvalidState(String),

    #[error("Slot not found: {0}")]
    NotFound(String),

    #[error("Slot {0} was modified concurrently, retry the request")]
    ConcurrentModification(Uuid),

    #[error("Slot storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for SlotError {
    fn from(err: anyhow::Error) -> Self {
        SlotError::Storage(err.to_string())
    }
}

impl From<TimetableError> for SlotError {
    fn from(err: TimetableError) -> Self {
        match err {
            TimetableError::Validation(msg) => SlotError::Validation(msg),
            TimetableError::NotFound(msg) => SlotError::NotFound(msg),
            TimetableError::Conflict(msg) => SlotError::InvalidState(msg),
            TimetableError::Storage(msg) => SlotError::Storage(msg),
        }
    }
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        let message = err.to_string();
        match err {
            SlotError::Validation(msg) => AppError::ValidationError(msg),
            SlotError::SlotUnavailable { reason, .. } => AppError::SlotUnavailable {
                reason: reason.as_str().to_string(),
                message,
            },
            SlotError::CapacityExceeded { .. } => AppError::SlotUnavailable {
                reason: UnavailableReason::FullyBooked.as_str().to_string(),
                message,
            },
            SlotError::SlotNotBookable { .. } => AppError::SlotUnavailable {
                reason: UnavailableReason::NotBookable.as_str().to_string(),
                message,
            },
            SlotError::InvalidState(msg) => AppError::Conflict(msg),
            SlotError::NotFound(msg) => AppError::NotFound(msg),
            SlotError::ConcurrentModification(_) => AppError::Conflict(message),
            SlotError::Storage(msg) => AppError::Database(msg),
        }
    }
}
