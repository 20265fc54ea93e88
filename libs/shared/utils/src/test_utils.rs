use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_models::auth::User;

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub storage_backend: StorageBackend,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            storage_backend: StorageBackend::Memory,
        }
    }
}

impl TestConfig {
    /// Config pointing the Supabase backends at a mock server.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            storage_backend: StorageBackend::Supabase,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            storage_backend: self.storage_backend,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub clinic_ids: Vec<Uuid>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
            clinic_ids: Vec::new(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str, clinic_ids: &[Uuid]) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            clinic_ids: clinic_ids.to_vec(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor", &[])
    }

    pub fn doctor_in(email: &str, clinic_ids: &[Uuid]) -> Self {
        Self::new(email, "doctor", clinic_ids)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient", &[])
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin", &[])
    }

    pub fn clinic_admin(email: &str, clinic_ids: &[Uuid]) -> Self {
        Self::new(email, "clinic_admin", clinic_ids)
    }

    pub fn staff(email: &str, clinic_ids: &[Uuid]) -> Self {
        Self::new(email, "staff", clinic_ids)
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).unwrap_or_default()
    }

    fn app_metadata(&self) -> serde_json::Value {
        json!({
            "clinic_ids": self.clinic_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>()
        })
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            app_metadata: Some(self.app_metadata()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "app_metadata": user.app_metadata(),
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    /// Token accepted by [`TestConfig::default`].
    pub fn bearer_for(user: &TestUser) -> String {
        format!("Bearer {}", Self::create_test_token(user, TEST_JWT_SECRET, Some(1)))
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}
