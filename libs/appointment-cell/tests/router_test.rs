// libs/appointment-cell/tests/router_test.rs
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::appointment_routes;
use appointment_cell::services::{
    AppointmentBookingService, AppointmentCommitments, InMemoryAppointmentRepository,
};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use slot_cell::models::{Slot, SlotStatus};
use slot_cell::services::{
    AvailabilityResolver, BookingAllocator, ClinicDoctor, InMemoryDoctorDirectory,
    InMemorySlotRepository, SlotRepository,
};
use timetable_cell::models::{CreateTimetableEntryRequest, DayOfWeek, TimetableOwner};
use timetable_cell::services::InMemoryTimetableRepository;
use timetable_cell::TimetableService;

struct Harness {
    app: Router,
    slots: Arc<InMemorySlotRepository>,
    directory: Arc<InMemoryDoctorDirectory>,
    timetables: Arc<TimetableService>,
    slot: Slot,
}

async fn harness(capacity: u32) -> Harness {
    let slots = Arc::new(InMemorySlotRepository::new());
    let now = Utc::now();
    let slot = Slot {
        id: Uuid::new_v4(),
        clinic_id: Uuid::new_v4(),
        doctor_id: Some(Uuid::new_v4()),
        service_id: None,
        slot_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        start_time: "09:00".parse().unwrap(),
        end_time: "09:30".parse().unwrap(),
        status: SlotStatus::Available,
        max_concurrent_appointments: capacity,
        current_appointment_count: 0,
        is_clinic_level: false,
        created_at: now,
        updated_at: now,
    };
    slots.insert_batch(vec![slot.clone()]).await.unwrap();

    let appointments = Arc::new(InMemoryAppointmentRepository::new());
    let timetables = Arc::new(TimetableService::new(Arc::new(InMemoryTimetableRepository::new())));
    let directory = Arc::new(InMemoryDoctorDirectory::new());
    let resolver = AvailabilityResolver::new(directory.clone(), timetables.clone(), slots.clone())
        .with_commitments(Arc::new(AppointmentCommitments::new(appointments.clone())));

    let service = Arc::new(AppointmentBookingService::new(
        slots.clone(),
        Arc::new(BookingAllocator::new(slots.clone())),
        Arc::new(resolver),
        appointments,
    ));
    let state = Arc::new(AppointmentState { config: TestConfig::default().to_arc(), service });

    Harness { app: appointment_routes(state), slots, directory, timetables, slot }
}

async fn send(app: &Router, method: Method, uri: &str, user: Option<&TestUser>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, JwtTestUtils::bearer_for(user));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn every_route_requires_a_token() {
    let h = harness(1).await;
    let (status, body) = send(&h.app, Method::POST, "/", None, Some(json!({ "slot_id": h.slot.id }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn patient_books_and_cancels_own_appointment() {
    let h = harness(1).await;
    let patient = TestUser::patient("pat@example.test");

    let (status, booked) = send(&h.app, Method::POST, "/", Some(&patient), Some(json!({ "slot_id": h.slot.id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booked["data"]["patient_id"], patient.id.as_str());
    assert_eq!(booked["data"]["status"], "booked");

    let appointment_id = booked["data"]["id"].as_str().unwrap().to_string();
    let (status, fetched) = send(&h.app, Method::GET, &format!("/{}", appointment_id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["id"], appointment_id.as_str());

    let (status, cancelled) = send(
        &h.app,
        Method::POST,
        &format!("/{}/cancel", appointment_id),
        Some(&patient),
        Some(json!({ "reason": "travel" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["data"]["status"], "cancelled");
    assert_eq!(h.slots.get(h.slot.id).await.unwrap().current_appointment_count, 0);
}

#[tokio::test]
async fn full_slot_answers_conflict_with_reason() {
    let h = harness(1).await;
    let first = TestUser::patient("one@example.test");
    let second = TestUser::patient("two@example.test");

    send(&h.app, Method::POST, "/", Some(&first), Some(json!({ "slot_id": h.slot.id }))).await;
    let (status, body) = send(&h.app, Method::POST, "/", Some(&second), Some(json!({ "slot_id": h.slot.id }))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SLOT_UNAVAILABLE");
    assert_eq!(body["reason"], "fully booked");
}

#[tokio::test]
async fn booking_for_someone_else_needs_clinic_staff() {
    let h = harness(2).await;
    let patient = TestUser::patient("pat@example.test");
    let other_patient = Uuid::new_v4();
    let staff = TestUser::staff("desk@clinic.test", &[h.slot.clinic_id]);

    let body = json!({ "slot_id": h.slot.id, "patient_id": other_patient });
    let (status, _) = send(&h.app, Method::POST, "/", Some(&patient), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, booked) = send(&h.app, Method::POST, "/", Some(&staff), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booked["data"]["patient_id"], other_patient.to_string());
}

#[tokio::test]
async fn strangers_cannot_see_or_cancel() {
    let h = harness(1).await;
    let patient = TestUser::patient("pat@example.test");
    let stranger = TestUser::patient("nosy@example.test");

    let (_, booked) = send(&h.app, Method::POST, "/", Some(&patient), Some(json!({ "slot_id": h.slot.id }))).await;
    let appointment_id = booked["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&h.app, Method::GET, &format!("/{}", appointment_id), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&h.app, Method::POST, &format!("/{}/cancel", appointment_id), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listed) = send(&h.app, Method::GET, "/", Some(&stranger), None).await;
    assert_eq!(listed["data"]["total"], 0);

    let (_, own) = send(&h.app, Method::GET, "/", Some(&patient), None).await;
    assert_eq!(own["data"]["total"], 1);
}

#[tokio::test]
async fn doctor_already_booked_in_window_answers_conflict() {
    let h = harness(1).await;
    let clinic_id = h.slot.clinic_id;
    let doctor_id = Uuid::new_v4();
    h.directory.register(ClinicDoctor { clinic_id, doctor_id, service_ids: Vec::new() }).await;
    h.timetables
        .create_entry(TimetableOwner::doctor(doctor_id), CreateTimetableEntryRequest {
            day_of_week: DayOfWeek::Mon,
            start_time: "08:00".parse().unwrap(),
            end_time: "12:00".parse().unwrap(),
            is_active: None,
            slot_order: None,
            notes: None,
        })
        .await
        .unwrap();

    let shared = Slot {
        id: Uuid::new_v4(),
        doctor_id: None,
        is_clinic_level: true,
        max_concurrent_appointments: 4,
        ..h.slot.clone()
    };
    h.slots.insert_batch(vec![shared.clone()]).await.unwrap();

    let body = json!({ "slot_id": shared.id, "doctor_id": doctor_id });
    let (status, _) = send(&h.app, Method::POST, "/", Some(&TestUser::patient("a@example.test")), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, rejected) = send(&h.app, Method::POST, "/", Some(&TestUser::patient("b@example.test")), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(rejected["reason"], "fully booked");

    let stranger = json!({ "slot_id": shared.id, "doctor_id": Uuid::new_v4() });
    let (status, _) = send(&h.app, Method::POST, "/", Some(&TestUser::patient("c@example.test")), Some(stranger)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
