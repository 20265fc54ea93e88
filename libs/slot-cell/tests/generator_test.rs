// libs/slot-cell/tests/generator_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use slot_cell::models::{FallbackSchedule, GenerationRequest, SlotFilter};
use slot_cell::services::{InMemorySlotRepository, SlotGenerator, SlotRepository};
use slot_cell::SlotError;
use timetable_cell::models::{CreateTimetableEntryRequest, DayOfWeek, TimeOfDay, TimetableOwner};
use timetable_cell::services::{InMemoryTimetableRepository, TimetableService};

struct Fixture {
    slots: Arc<InMemorySlotRepository>,
    timetables: Arc<TimetableService>,
    generator: SlotGenerator,
}

fn fixture() -> Fixture {
    let slots = Arc::new(InMemorySlotRepository::new());
    let timetables = Arc::new(TimetableService::new(Arc::new(InMemoryTimetableRepository::new())));
    let generator = SlotGenerator::new(slots.clone(), timetables.clone(), 366);
    Fixture { slots, timetables, generator }
}

fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

async fn add_window(timetables: &TimetableService, owner: TimetableOwner, day: DayOfWeek, start: &str, end: &str) {
    timetables
        .create_entry(owner, CreateTimetableEntryRequest {
            day_of_week: day,
            start_time: t(start),
            end_time: t(end),
            is_active: None,
            slot_order: None,
            notes: None,
        })
        .await
        .unwrap();
}

fn request(clinic_id: Uuid, doctor_id: Option<Uuid>, from: NaiveDate, to: NaiveDate, duration: i64) -> GenerationRequest {
    GenerationRequest {
        clinic_id,
        doctor_id,
        service_id: None,
        is_clinic_level: false,
        start_date: from,
        end_date: to,
        slot_duration_minutes: duration,
        max_concurrent_appointments: 1,
        fallback: None,
    }
}

#[tokio::test]
async fn clinic_morning_window_yields_eight_half_hour_slots() {
    let f = fixture();
    let clinic = Uuid::new_v4();
    add_window(&f.timetables, TimetableOwner::clinic(clinic), DayOfWeek::Mon, "08:00", "12:00").await;

    let result = tokio_test::assert_ok!(f.generator.generate(&request(clinic, None, monday(), monday(), 30)).await);

    assert_eq!(result.created, 8);
    assert_eq!(result.skipped, 0);

    let stored = f.slots.list(SlotFilter::for_owner(clinic, None)).await.unwrap();
    let starts: Vec<String> = stored.iter().map(|s| s.start_time.to_string()).collect();
    assert_eq!(starts, vec!["08:00", "08:30", "09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]);
    for pair in stored.windows(2) {
        assert!(pair[0].end_time <= pair[1].start_time);
    }
    assert!(stored.iter().all(|s| s.is_clinic_level && s.doctor_id.is_none()));
}

#[tokio::test]
async fn split_shift_leaves_a_gap() {
    let f = fixture();
    let clinic = Uuid::new_v4();
    let doctor = Uuid::new_v4();
    let owner = TimetableOwner::doctor(doctor);
    add_window(&f.timetables, owner, DayOfWeek::Mon, "08:00", "10:00").await;
    add_window(&f.timetables, owner, DayOfWeek::Mon, "14:00", "16:00").await;

    let result = f.generator.generate(&request(clinic, Some(doctor), monday(), monday(), 30)).await.unwrap();
    assert_eq!(result.created, 8);

    for slot in &result.slots {
        let inside_morning = slot.start_time >= t("08:00") && slot.end_time <= t("10:00");
        let inside_afternoon = slot.start_time >= t("14:00") && slot.end_time <= t("16:00");
        assert!(inside_morning || inside_afternoon, "slot {} outside windows", slot.start_time);
        assert!(!slot.overlaps(t("10:00"), t("14:00")));
        assert_eq!(slot.doctor_id, Some(doctor));
    }
}

#[tokio::test]
async fn regenerating_the_same_range_creates_nothing_new() {
    let f = fixture();
    let clinic = Uuid::new_v4();
    add_window(&f.timetables, TimetableOwner::clinic(clinic), DayOfWeek::Mon, "08:00", "09:00").await;
    let req = request(clinic, None, monday(), monday(), 15);

    let first = f.generator.generate(&req).await.unwrap();
    let second = f.generator.generate(&req).await.unwrap();

    assert_eq!(first.created, 4);
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 4);
    assert_eq!(f.slots.list(SlotFilter::for_owner(clinic, None)).await.unwrap().len(), 4);
}

#[tokio::test]
async fn only_matching_weekdays_are_generated() {
    let f = fixture();
    let clinic = Uuid::new_v4();
    add_window(&f.timetables, TimetableOwner::clinic(clinic), DayOfWeek::Wed, "10:00", "11:00").await;

    let sunday = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
    let result = f.generator.generate(&request(clinic, None, monday(), sunday, 60)).await.unwrap();

    assert_eq!(result.created, 1);
    assert_eq!(result.slots[0].slot_date, NaiveDate::from_ymd_opt(2025, 3, 5).unwrap());
}

#[tokio::test]
async fn empty_timetable_uses_fallback_or_nothing() {
    let f = fixture();
    let clinic = Uuid::new_v4();

    let bare = f.generator.generate(&request(clinic, None, monday(), monday(), 60)).await.unwrap();
    assert_eq!(bare.created, 0);

    let mut with_fallback = request(clinic, None, monday(), monday(), 60);
    with_fallback.fallback = Some(FallbackSchedule {
        days_of_week: vec![DayOfWeek::Mon],
        day_start_time: None,
        day_end_time: None,
    });
    let result = f.generator.generate(&with_fallback).await.unwrap();

    // 09:00 to 17:00 in hour steps
    assert_eq!(result.created, 8);
    assert_eq!(result.slots[0].start_time, t("09:00"));
}

#[tokio::test]
async fn fallback_fills_weekdays_the_timetable_leaves_empty() {
    let f = fixture();
    let clinic = Uuid::new_v4();
    add_window(&f.timetables, TimetableOwner::clinic(clinic), DayOfWeek::Mon, "08:00", "09:00").await;

    let sunday = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
    let mut req = request(clinic, None, monday(), sunday, 60);
    req.fallback = Some(FallbackSchedule {
        days_of_week: vec![DayOfWeek::Mon, DayOfWeek::Tue, DayOfWeek::Wed, DayOfWeek::Thu, DayOfWeek::Fri],
        day_start_time: None,
        day_end_time: None,
    });

    let result = f.generator.generate(&req).await.unwrap();

    // Monday keeps its own 08:00 window, Tuesday to Friday get 09:00 to 17:00
    assert_eq!(result.created, 1 + 4 * 8);
    let on_monday: Vec<String> = result
        .slots
        .iter()
        .filter(|s| s.slot_date == monday())
        .map(|s| s.start_time.to_string())
        .collect();
    assert_eq!(on_monday, vec!["08:00"]);
    let tuesday = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
    assert_eq!(result.slots.iter().filter(|s| s.slot_date == tuesday).count(), 8);
    assert!(result.slots.iter().all(|s| s.slot_date < NaiveDate::from_ymd_opt(2025, 3, 8).unwrap()));
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_writing() {
    let f = fixture();
    let clinic = Uuid::new_v4();
    add_window(&f.timetables, TimetableOwner::clinic(clinic), DayOfWeek::Mon, "08:00", "12:00").await;

    let inverted = request(clinic, None, monday(), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(), 30);
    assert_matches!(f.generator.generate(&inverted).await, Err(SlotError::Validation(_)));

    let too_short = request(clinic, None, monday(), monday(), 4);
    assert_matches!(f.generator.generate(&too_short).await, Err(SlotError::Validation(_)));

    let mut no_capacity = request(clinic, None, monday(), monday(), 30);
    no_capacity.max_concurrent_appointments = 0;
    assert_matches!(f.generator.generate(&no_capacity).await, Err(SlotError::Validation(_)));

    let too_long = request(clinic, None, monday(), NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(), 30);
    assert_matches!(f.generator.generate(&too_long).await, Err(SlotError::Validation(_)));

    let mut bad_fallback = request(clinic, None, monday(), monday(), 30);
    bad_fallback.fallback = Some(FallbackSchedule {
        days_of_week: vec![DayOfWeek::Mon],
        day_start_time: Some(t("17:00")),
        day_end_time: Some(t("09:00")),
    });
    assert_matches!(f.generator.generate(&bad_fallback).await, Err(SlotError::Validation(_)));

    assert!(f.slots.list(SlotFilter::for_owner(clinic, None)).await.unwrap().is_empty());
}

#[tokio::test]
async fn capacity_and_service_are_copied_onto_slots() {
    let f = fixture();
    let clinic = Uuid::new_v4();
    let service = Uuid::new_v4();
    add_window(&f.timetables, TimetableOwner::clinic(clinic), DayOfWeek::Mon, "08:00", "08:20").await;

    let mut req = request(clinic, None, monday(), monday(), 20);
    req.max_concurrent_appointments = 3;
    req.service_id = Some(service);

    let result = f.generator.generate(&req).await.unwrap();
    assert_eq!(result.created, 1);
    assert_eq!(result.slots[0].max_concurrent_appointments, 3);
    assert_eq!(result.slots[0].current_appointment_count, 0);
    assert_eq!(result.slots[0].service_id, Some(service));
    assert_eq!(result.slots[0].remaining_capacity(), 3);
}
