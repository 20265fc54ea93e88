// libs/timetable-cell/tests/supabase_store_test.rs
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_utils::test_utils::TestConfig;
use timetable_cell::models::{DayOfWeek, TimetableOwner};
use timetable_cell::services::{SupabaseTimetableRepository, TimetableRepository};
use timetable_cell::TimetableError;

const TABLE_PATH: &str = "/rest/v1/timetables";

fn row(owner: TimetableOwner, day: &str, start: &str, end: &str, order: u32) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "owner_kind": owner.kind,
        "owner_id": owner.id,
        "day_of_week": day,
        "start_time": start,
        "end_time": end,
        "is_active": true,
        "slot_order": order,
        "notes": null,
        "created_at": Utc::now(),
        "updated_at": Utc::now(),
    })
}

#[tokio::test]
async fn list_orders_days_of_week_locally() {
    let server = MockServer::start().await;
    let owner = TimetableOwner::doctor(Uuid::new_v4());

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("owner_kind", "eq.doctor"))
        .and(query_param("owner_id", format!("eq.{}", owner.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row(owner, "friday", "08:00:00", "12:00:00", 1),
            row(owner, "mon", "14:00:00", "16:00:00", 2),
            row(owner, "mon", "08:00:00", "10:00:00", 1),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let repo = SupabaseTimetableRepository::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config());
    let entries = tokio_test::assert_ok!(repo.list(owner).await);

    let order: Vec<(DayOfWeek, String)> = entries
        .iter()
        .map(|e| (e.day_of_week, e.start_time.to_string()))
        .collect();
    assert_eq!(order, vec![
        (DayOfWeek::Mon, "08:00".to_string()),
        (DayOfWeek::Mon, "14:00".to_string()),
        (DayOfWeek::Fri, "08:00".to_string()),
    ]);
}

#[tokio::test]
async fn delete_of_missing_row_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let repo = SupabaseTimetableRepository::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config());
    let result = repo.delete(TimetableOwner::clinic(Uuid::new_v4()), Uuid::new_v4()).await;
    assert!(matches!(result, Err(TimetableError::NotFound(_))));
}

#[tokio::test]
async fn replace_day_with_no_windows_only_deletes() {
    let server = MockServer::start().await;
    let owner = TimetableOwner::clinic(Uuid::new_v4());

    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("day_of_week", "eq.tue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(owner, "tue", "08:00", "09:00", 1)])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let repo = SupabaseTimetableRepository::new(&TestConfig::with_supabase_url(&server.uri()).to_app_config());
    let stored = repo.replace_day(owner, DayOfWeek::Tue, Vec::new()).await.unwrap();
    assert!(stored.is_empty());
}
