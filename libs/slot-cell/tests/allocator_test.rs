// libs/slot-cell/tests/allocator_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use uuid::Uuid;

use slot_cell::models::{Slot, SlotStatus, UnavailableReason};
use slot_cell::services::{BookingAllocator, InMemorySlotRepository, SlotRepository};
use slot_cell::SlotError;

fn slot(max: u32, current: u32) -> Slot {
    let now = Utc::now();
    Slot {
        id: Uuid::new_v4(),
        clinic_id: Uuid::new_v4(),
        doctor_id: Some(Uuid::new_v4()),
        service_id: None,
        slot_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        start_time: "10:00".parse().unwrap(),
        end_time: "10:30".parse().unwrap(),
        status: if current > 0 { SlotStatus::Booked } else { SlotStatus::Available },
        max_concurrent_appointments: max,
        current_appointment_count: current,
        is_clinic_level: false,
        created_at: now,
        updated_at: now,
    }
}

async fn seeded(slot: &Slot) -> (Arc<InMemorySlotRepository>, BookingAllocator) {
    let repo = Arc::new(InMemorySlotRepository::new());
    repo.insert_batch(vec![slot.clone()]).await.unwrap();
    let allocator = BookingAllocator::new(repo.clone());
    (repo, allocator)
}

#[tokio::test]
async fn full_slot_is_unavailable() {
    let full = slot(1, 1);
    let (repo, allocator) = seeded(&full).await;

    let result = allocator.reserve(full.id, Uuid::new_v4()).await;
    assert_matches!(
        result,
        Err(SlotError::SlotUnavailable { reason: UnavailableReason::FullyBooked, .. })
    );
    assert_eq!(repo.get(full.id).await.unwrap().current_appointment_count, 1);
}

#[tokio::test]
async fn reserve_then_release_restores_the_slot() {
    let open = slot(2, 0);
    let (repo, allocator) = seeded(&open).await;

    let reserved = allocator.reserve(open.id, Uuid::new_v4()).await.unwrap();
    assert_eq!(reserved.status, SlotStatus::Booked);
    assert_eq!(reserved.current_appointment_count, 1);

    let released = allocator.release(open.id, Uuid::new_v4()).await.unwrap();
    assert_eq!(released.status, SlotStatus::Available);
    assert_eq!(released.current_appointment_count, 0);

    let stored = repo.get(open.id).await.unwrap();
    assert_eq!(stored.status, open.status);
    assert_eq!(stored.current_appointment_count, open.current_appointment_count);
}

#[tokio::test]
async fn release_on_empty_slot_fails_without_change() {
    let open = slot(1, 0);
    let (repo, allocator) = seeded(&open).await;

    assert_matches!(allocator.release(open.id, Uuid::new_v4()).await, Err(SlotError::InvalidState(_)));
    assert_eq!(repo.get(open.id).await.unwrap().current_appointment_count, 0);
}

#[tokio::test]
async fn cancelled_slot_cannot_be_reserved() {
    let open = slot(1, 0);
    let (repo, allocator) = seeded(&open).await;
    repo.set_status(open.id, SlotStatus::Cancelled).await.unwrap();

    assert_matches!(
        allocator.reserve(open.id, Uuid::new_v4()).await,
        Err(SlotError::SlotUnavailable { reason: UnavailableReason::NotBookable, .. })
    );
}

#[tokio::test]
async fn unknown_slot_is_not_found() {
    let allocator = BookingAllocator::new(Arc::new(InMemorySlotRepository::new()));
    assert_matches!(allocator.reserve(Uuid::new_v4(), Uuid::new_v4()).await, Err(SlotError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_overbook() {
    let contested = slot(1, 0);
    let (repo, allocator) = seeded(&contested).await;
    let allocator = Arc::new(allocator);

    let attempts = join_all((0..16).map(|_| {
        let allocator = allocator.clone();
        let slot_id = contested.id;
        tokio::spawn(async move { allocator.reserve(slot_id, Uuid::new_v4()).await })
    }))
    .await;

    let outcomes: Vec<_> = attempts.into_iter().map(|joined| joined.unwrap()).collect();
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| matches!(err, SlotError::SlotUnavailable { reason: UnavailableReason::FullyBooked, .. })));

    let stored = repo.get(contested.id).await.unwrap();
    assert_eq!(stored.current_appointment_count, 1);
    assert_eq!(stored.status, SlotStatus::Booked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_fill_capacity_exactly() {
    let shared = slot(5, 0);
    let (repo, allocator) = seeded(&shared).await;
    let allocator = Arc::new(allocator);

    let attempts = join_all((0..12).map(|_| {
        let allocator = allocator.clone();
        let slot_id = shared.id;
        tokio::spawn(async move { allocator.reserve(slot_id, Uuid::new_v4()).await })
    }))
    .await;

    let successes = attempts.into_iter().filter(|joined| matches!(joined, Ok(Ok(_)))).count();
    assert_eq!(successes, 5);
    assert_eq!(repo.get(shared.id).await.unwrap().current_appointment_count, 5);
}
