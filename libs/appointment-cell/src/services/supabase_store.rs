use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, PREFER_REPRESENTATION};

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus};
use crate::services::store::AppointmentRepository;

const TABLE: &str = "appointments";

pub struct SupabaseAppointmentRepository {
    supabase: SupabaseClient,
    service_key: String,
}

impl SupabaseAppointmentRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            service_key: config.supabase_service_role_key.clone(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(self.service_key.as_str()).filter(|key| !key.is_empty())
    }
}

fn filter_query(filter: &AppointmentFilter) -> String {
    let mut parts = Vec::new();
    if let Some(clinic_id) = filter.clinic_id {
        parts.push(format!("clinic_id=eq.{}", clinic_id));
    }
    if let Some(doctor_id) = filter.doctor_id {
        parts.push(format!("doctor_id=eq.{}", doctor_id));
    }
    if let Some(patient_id) = filter.patient_id {
        parts.push(format!("patient_id=eq.{}", patient_id));
    }
    if let Some(status) = filter.status {
        parts.push(format!("status=eq.{}", status));
    }
    parts.push("order=created_at.desc".to_string());
    parts.join("&")
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let rows: Vec<Appointment> = self.supabase
            .insert(TABLE, "", json!(appointment), PREFER_REPRESENTATION, self.token())
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Storage("Failed to create appointment".to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let query = format!("id=eq.{}", id);
        let rows: Vec<Appointment> = self.supabase.select(TABLE, &query, self.token()).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppointmentError::NotFound(id.to_string()))
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let rows: Vec<Appointment> = self.supabase.select(TABLE, &filter_query(&filter), self.token()).await?;
        debug!("Loaded {} appointments", rows.len());
        Ok(rows)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let query = format!("id=eq.{}&status=eq.{}", id, from);
        let mut patch = json!({
            "status": to,
            "updated_at": Utc::now(),
        });
        if let Some(reason) = reason {
            patch["cancellation_reason"] = json!(reason);
        }

        let rows: Vec<Appointment> = self.supabase.update(TABLE, &query, patch, self.token()).await?;
        if let Some(updated) = rows.into_iter().next() {
            return Ok(updated);
        }

        let current = self.get(id).await?;
        Err(AppointmentError::InvalidState(format!(
            "appointment {} is {}, expected {}",
            id, current.status, from
        )))
    }
}
