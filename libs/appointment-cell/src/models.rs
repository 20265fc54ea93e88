// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// Booking held against a slot. The slot itself only tracks a count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
    Completed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub slot_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Booking after the caller's identity has been resolved.
#[derive(Debug, Clone)]
pub struct BookingCommand {
    pub slot_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentSearchQuery {
    pub clinic_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub clinic_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.clinic_id.map_or(true, |id| appointment.clinic_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
    }
}

impl From<&AppointmentSearchQuery> for AppointmentFilter {
    fn from(query: &AppointmentSearchQuery) -> Self {
        Self {
            clinic_id: query.clinic_id,
            doctor_id: query.doctor_id,
            patient_id: query.patient_id,
            status: query.status,
        }
    }
}
