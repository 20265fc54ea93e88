use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError>;

    /// Newest first.
    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError>;

    /// Moves `id` from `from` to `to`. Fails with `InvalidState` if the stored
    /// status is no longer `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError>;
}

#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::Storage(format!("appointment {} already exists", appointment.id)));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppointmentError::NotFound(id.to_string()))
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let mut found: Vec<Appointment> = self.appointments
            .read()
            .await
            .values()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&id)
            .ok_or_else(|| AppointmentError::NotFound(id.to_string()))?;

        if appointment.status != from {
            return Err(AppointmentError::InvalidState(format!(
                "appointment {} is {}, expected {}",
                id, appointment.status, from
            )));
        }

        appointment.status = to;
        if reason.is_some() {
            appointment.cancellation_reason = reason;
        }
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }
}
