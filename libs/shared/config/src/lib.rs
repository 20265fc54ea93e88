use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Ok(StorageBackend::Memory),
            "supabase" => Ok(StorageBackend::Supabase),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_role_key: String,
    pub storage_backend: StorageBackend,
    pub server_port: u16,
    pub slot_default_duration_minutes: u32,
    pub slot_default_capacity: u32,
    pub slot_regeneration_horizon_days: u32,
    pub slot_max_generation_days: u32,
    pub slot_reserve_max_retries: u32,
    pub doctor_directory_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            supabase_service_role_key: String::new(),
            storage_backend: StorageBackend::Memory,
            server_port: 3000,
            slot_default_duration_minutes: 15,
            slot_default_capacity: 1,
            slot_regeneration_horizon_days: 30,
            slot_max_generation_days: 366,
            slot_reserve_max_retries: 5,
            doctor_directory_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| supabase_anon_key.clone()),
            supabase_anon_key,
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            storage_backend: parse_var("STORAGE_BACKEND", defaults.storage_backend),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            slot_default_duration_minutes: parse_var(
                "SLOT_DEFAULT_DURATION_MINUTES",
                defaults.slot_default_duration_minutes,
            ),
            slot_default_capacity: parse_var("SLOT_DEFAULT_CAPACITY", defaults.slot_default_capacity),
            slot_regeneration_horizon_days: parse_var(
                "SLOT_REGENERATION_HORIZON_DAYS",
                defaults.slot_regeneration_horizon_days,
            ),
            slot_max_generation_days: parse_var(
                "SLOT_MAX_GENERATION_DAYS",
                defaults.slot_max_generation_days,
            ),
            slot_reserve_max_retries: parse_var(
                "SLOT_RESERVE_MAX_RETRIES",
                defaults.slot_reserve_max_retries,
            ),
            doctor_directory_path: env::var("DOCTOR_DIRECTORY_PATH").ok(),
        };

        if config.storage_backend == StorageBackend::Supabase && !config.is_configured() {
            warn!("Supabase storage selected but not fully configured - missing environment variables");
        }

        if config.supabase_jwt_secret.is_empty() {
            warn!("JWT secret missing - authenticated routes will reject every request");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
