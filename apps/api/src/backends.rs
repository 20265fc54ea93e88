use std::sync::Arc;

use tracing::info;

use appointment_cell::services::{
    AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository,
};
use shared_config::{AppConfig, StorageBackend};
use slot_cell::services::{
    DoctorDirectory, InMemoryDoctorDirectory, InMemorySlotRepository, SlotRepository,
    SupabaseDoctorDirectory, SupabaseSlotRepository,
};
use timetable_cell::services::{
    InMemoryTimetableRepository, SupabaseTimetableRepository, TimetableRepository,
};

/// Storage implementations selected by `STORAGE_BACKEND`.
pub struct Backends {
    pub timetables: Arc<dyn TimetableRepository>,
    pub slots: Arc<dyn SlotRepository>,
    pub directory: Arc<dyn DoctorDirectory>,
    pub appointments: Arc<dyn AppointmentRepository>,
}

impl Backends {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        info!("Using {:?} storage backend", config.storage_backend);

        let backends = match config.storage_backend {
            StorageBackend::Memory => Self {
                timetables: Arc::new(InMemoryTimetableRepository::new()),
                slots: Arc::new(InMemorySlotRepository::new()),
                directory: Arc::new(Self::memory_directory(config)?),
                appointments: Arc::new(InMemoryAppointmentRepository::new()),
            },
            StorageBackend::Supabase => Self {
                timetables: Arc::new(SupabaseTimetableRepository::new(config)),
                slots: Arc::new(SupabaseSlotRepository::new(config)),
                directory: match &config.doctor_directory_path {
                    Some(_) => Arc::new(Self::memory_directory(config)?),
                    None => Arc::new(SupabaseDoctorDirectory::new(config)),
                },
                appointments: Arc::new(SupabaseAppointmentRepository::new(config)),
            },
        };

        Ok(backends)
    }

    fn memory_directory(config: &AppConfig) -> anyhow::Result<InMemoryDoctorDirectory> {
        match &config.doctor_directory_path {
            Some(path) => InMemoryDoctorDirectory::from_json_file(path),
            None => Ok(InMemoryDoctorDirectory::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn memory_backend_seeds_directory_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();

        let config = AppConfig {
            doctor_directory_path: Some(file.path().display().to_string()),
            ..AppConfig::default()
        };
        assert!(Backends::from_config(&config).is_ok());
    }

    #[test]
    fn unreadable_directory_aborts_startup() {
        let config = AppConfig {
            doctor_directory_path: Some("/nonexistent/doctors.json".to_string()),
            ..AppConfig::default()
        };
        assert!(Backends::from_config(&config).is_err());
    }
}
