use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    pub fn user_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.id).ok()
    }

    /// Clinics listed under `app_metadata.clinic_ids`. Entries that are not
    /// valid UUIDs are ignored.
    pub fn clinic_ids(&self) -> Vec<Uuid> {
        self.app_metadata
            .as_ref()
            .and_then(|meta| meta.get("clinic_ids"))
            .and_then(|ids| ids.as_array())
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.as_str())
                    .filter_map(|id| Uuid::parse_str(id).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clinic_ids_skip_malformed_entries() {
        let clinic = Uuid::new_v4();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: None,
            role: Some("staff".to_string()),
            app_metadata: Some(json!({ "clinic_ids": [clinic.to_string(), "nope", 7] })),
            metadata: None,
            created_at: None,
        };

        assert_eq!(user.clinic_ids(), vec![clinic]);
        assert!(user.has_role("staff"));
        assert!(user.user_uuid().is_some());
    }
}
