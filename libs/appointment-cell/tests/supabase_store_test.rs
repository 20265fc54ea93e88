// libs/appointment-cell/tests/supabase_store_test.rs
use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::AppointmentStatus;
use appointment_cell::services::{AppointmentRepository, SupabaseAppointmentRepository};
use appointment_cell::AppointmentError;
use shared_utils::test_utils::TestConfig;

const TABLE_PATH: &str = "/rest/v1/appointments";

fn row(id: Uuid, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "slot_id": Uuid::new_v4(),
        "clinic_id": Uuid::new_v4(),
        "doctor_id": Uuid::new_v4(),
        "patient_id": Uuid::new_v4(),
        "status": status,
        "notes": null,
        "cancellation_reason": null,
        "created_at": Utc::now(),
        "updated_at": Utc::now(),
    })
}

fn repository(server: &MockServer) -> SupabaseAppointmentRepository {
    SupabaseAppointmentRepository::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config())
}

#[tokio::test]
async fn transition_patches_only_the_expected_status() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", format!("eq.{}", id)))
        .and(query_param("status", "eq.booked"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(id, "cancelled")])))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    let updated = tokio_test::assert_ok!(
        repo.transition(id, AppointmentStatus::Booked, AppointmentStatus::Cancelled, Some("ill".into()))
            .await
    );
    assert_eq!(updated.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn transition_from_wrong_status_is_invalid_state() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(id, "cancelled")])))
        .mount(&server)
        .await;

    let repo = repository(&server);
    let result = repo
        .transition(id, AppointmentStatus::Booked, AppointmentStatus::Cancelled, None)
        .await;
    assert_matches!(result, Err(AppointmentError::InvalidState(_)));
}

#[tokio::test]
async fn missing_appointment_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let repo = repository(&server);
    assert_matches!(repo.get(Uuid::new_v4()).await, Err(AppointmentError::NotFound(_)));
}
