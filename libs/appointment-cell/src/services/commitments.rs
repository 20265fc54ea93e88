use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use slot_cell::services::DoctorCommitments;
use slot_cell::SlotError;

use crate::models::{AppointmentFilter, AppointmentStatus};
use crate::services::store::AppointmentRepository;

/// Feeds booked appointments back into slot availability.
pub struct AppointmentCommitments {
    appointments: Arc<dyn AppointmentRepository>,
}

impl AppointmentCommitments {
    pub fn new(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }
}

#[async_trait]
impl DoctorCommitments for AppointmentCommitments {
    async fn booked_slot_ids(&self, doctor_id: Uuid) -> Result<Vec<Uuid>, SlotError> {
        let filter = AppointmentFilter {
            doctor_id: Some(doctor_id),
            status: Some(AppointmentStatus::Booked),
            ..Default::default()
        };

        let appointments = self
            .appointments
            .list(filter)
            .await
            .map_err(|err| SlotError::Storage(err.to_string()))?;
        Ok(appointments.into_iter().map(|appointment| appointment.slot_id).collect())
    }
}
