use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::error::SlotError;

/// Doctor affiliated with a clinic and the services they perform there.
/// An empty `service_ids` means the doctor offers every clinic service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicDoctor {
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub service_ids: Vec<Uuid>,
}

impl ClinicDoctor {
    pub fn offers(&self, service_id: Option<Uuid>) -> bool {
        match service_id {
            Some(service) => self.service_ids.is_empty() || self.service_ids.contains(&service),
            None => true,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// Doctors of `clinic_id` able to perform `service_id`, ordered by id.
    async fn clinic_doctors(&self, clinic_id: Uuid, service_id: Option<Uuid>) -> Result<Vec<ClinicDoctor>, SlotError>;
}

#[derive(Default)]
pub struct InMemoryDoctorDirectory {
    doctors: RwLock<HashMap<Uuid, Vec<ClinicDoctor>>>,
}

impl InMemoryDoctorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctors(doctors: Vec<ClinicDoctor>) -> Self {
        let mut by_clinic: HashMap<Uuid, Vec<ClinicDoctor>> = HashMap::new();
        for doctor in doctors {
            by_clinic.entry(doctor.clinic_id).or_default().push(doctor);
        }
        Self { doctors: RwLock::new(by_clinic) }
    }

    /// Seeds the directory from a JSON array of [`ClinicDoctor`] records.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading doctor directory {}", path.display()))?;
        let doctors: Vec<ClinicDoctor> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing doctor directory {}", path.display()))?;

        info!("Loaded {} clinic doctors from {}", doctors.len(), path.display());
        Ok(Self::with_doctors(doctors))
    }

    pub async fn register(&self, doctor: ClinicDoctor) {
        let mut doctors = self.doctors.write().await;
        let clinic = doctors.entry(doctor.clinic_id).or_default();
        clinic.retain(|existing| existing.doctor_id != doctor.doctor_id);
        clinic.push(doctor);
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn clinic_doctors(&self, clinic_id: Uuid, service_id: Option<Uuid>) -> Result<Vec<ClinicDoctor>, SlotError> {
        let mut found: Vec<ClinicDoctor> = self.doctors
            .read()
            .await
            .get(&clinic_id)
            .map(|doctors| doctors.iter().filter(|d| d.offers(service_id)).cloned().collect())
            .unwrap_or_default();
        found.sort_by_key(|doctor| doctor.doctor_id);
        Ok(found)
    }
}

/// Reads the `clinic_doctors` table.
pub struct SupabaseDoctorDirectory {
    supabase: SupabaseClient,
    service_key: String,
}

impl SupabaseDoctorDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            service_key: config.supabase_service_role_key.clone(),
        }
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn clinic_doctors(&self, clinic_id: Uuid, service_id: Option<Uuid>) -> Result<Vec<ClinicDoctor>, SlotError> {
        let query = format!(
            "clinic_id=eq.{}&is_active=eq.true&select=clinic_id,doctor_id,service_ids&order=doctor_id.asc",
            clinic_id
        );
        let token = Some(self.service_key.as_str()).filter(|key| !key.is_empty());
        let rows: Vec<ClinicDoctor> = self.supabase.select("clinic_doctors", &query, token).await?;

        Ok(rows.into_iter().filter(|d| d.offers(service_id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_directory_from_json_file() {
        let clinic = Uuid::new_v4();
        let service = Uuid::new_v4();
        let generalist = Uuid::new_v4();
        let specialist = Uuid::new_v4();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            serde_json::json!([
                { "clinic_id": clinic, "doctor_id": generalist },
                { "clinic_id": clinic, "doctor_id": specialist, "service_ids": [Uuid::new_v4()] },
            ])
        )
        .unwrap();

        let directory = InMemoryDoctorDirectory::from_json_file(file.path()).unwrap();

        assert_eq!(directory.clinic_doctors(clinic, None).await.unwrap().len(), 2);
        let for_service = directory.clinic_doctors(clinic, Some(service)).await.unwrap();
        assert_eq!(for_service.iter().map(|d| d.doctor_id).collect::<Vec<_>>(), vec![generalist]);
        assert!(directory.clinic_doctors(Uuid::new_v4(), None).await.unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(InMemoryDoctorDirectory::from_json_file("/nonexistent/doctors.json").is_err());
    }
}
