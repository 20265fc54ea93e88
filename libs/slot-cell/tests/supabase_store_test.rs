// libs/slot-cell/tests/supabase_store_test.rs
use assert_matches::assert_matches;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::supabase::PREFER_IGNORE_DUPLICATES;
use shared_utils::test_utils::TestConfig;
use slot_cell::models::{Slot, SlotStatus};
use slot_cell::services::{SlotRepository, SupabaseSlotRepository};
use slot_cell::SlotError;

const SLOTS_PATH: &str = "/rest/v1/appointment_slots";

fn slot(max: u32, current: u32) -> Slot {
    let now = Utc::now();
    Slot {
        id: Uuid::new_v4(),
        clinic_id: Uuid::new_v4(),
        doctor_id: Some(Uuid::new_v4()),
        service_id: None,
        slot_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        start_time: "08:00".parse().unwrap(),
        end_time: "08:30".parse().unwrap(),
        status: if current > 0 { SlotStatus::Booked } else { SlotStatus::Available },
        max_concurrent_appointments: max,
        current_appointment_count: current,
        is_clinic_level: false,
        created_at: now,
        updated_at: now,
    }
}

async fn repository(server: &MockServer) -> SupabaseSlotRepository {
    SupabaseSlotRepository::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config())
}

#[tokio::test]
async fn reserve_retries_after_losing_a_race() {
    let server = MockServer::start().await;
    let open = slot(2, 0);
    let mut booked = open.clone();
    booked.current_appointment_count = 1;
    booked.status = SlotStatus::Booked;

    Mock::given(method("GET"))
        .and(path(SLOTS_PATH))
        .and(query_param("id", format!("eq.{}", open.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([open])))
        .mount(&server)
        .await;

    // First compare-and-swap finds the row already changed
    Mock::given(method("PATCH"))
        .and(path(SLOTS_PATH))
        .and(query_param("current_appointment_count", "eq.0"))
        .and(query_param("status", "eq.available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(SLOTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([booked])))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server).await;
    let updated = repo.adjust_occupancy(open.id, 1).await.unwrap();
    assert_eq!(updated.current_appointment_count, 1);
    assert_eq!(updated.status, SlotStatus::Booked);
}

#[tokio::test]
async fn persistent_contention_gives_up() {
    let server = MockServer::start().await;
    let open = slot(1, 0);

    Mock::given(method("GET"))
        .and(path(SLOTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([open])))
        .mount(&server)
        .await;

    // Default config allows five retries after the first attempt
    Mock::given(method("PATCH"))
        .and(path(SLOTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(6)
        .mount(&server)
        .await;

    let repo = repository(&server).await;
    assert_matches!(
        repo.adjust_occupancy(open.id, 1).await,
        Err(SlotError::ConcurrentModification(id)) if id == open.id
    );
}

#[tokio::test]
async fn full_slot_is_rejected_without_writing() {
    let server = MockServer::start().await;
    let full = slot(1, 1);

    Mock::given(method("GET"))
        .and(path(SLOTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([full])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(SLOTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let repo = repository(&server).await;
    assert_matches!(repo.adjust_occupancy(full.id, 1).await, Err(SlotError::CapacityExceeded { .. }));
}

#[tokio::test]
async fn batch_insert_counts_ignored_duplicates() {
    let server = MockServer::start().await;
    let fresh = slot(1, 0);
    let duplicate = slot(1, 0);

    Mock::given(method("POST"))
        .and(path(SLOTS_PATH))
        .and(header("Prefer", PREFER_IGNORE_DUPLICATES))
        .and(query_param("on_conflict", "clinic_id,doctor_id,slot_date,start_time,end_time"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([fresh])))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server).await;
    let outcome = repo.insert_batch(vec![fresh.clone(), duplicate]).await.unwrap();
    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.created[0].id, fresh.id);
    assert_eq!(outcome.skipped, 1);
}

#[tokio::test]
async fn missing_slot_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SLOTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let repo = repository(&server).await;
    assert_matches!(repo.get(Uuid::new_v4()).await, Err(SlotError::NotFound(_)));
}

#[tokio::test]
async fn upstream_failure_is_a_storage_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SLOTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let repo = repository(&server).await;
    assert_matches!(repo.get(Uuid::new_v4()).await, Err(SlotError::Storage(_)));
}
