use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use timetable_cell::models::{DayOfWeek, TimeOfDay, TimetableEntry};
use timetable_cell::TimetableService;

use crate::error::SlotError;
use crate::models::{FallbackSchedule, GenerationRequest, GenerationResult, Slot, SlotStatus};
use crate::services::store::SlotRepository;

pub const MIN_SLOT_DURATION_MINUTES: i64 = 5;

/// Turns timetable windows into bookable slots.
pub struct SlotGenerator {
    slots: Arc<dyn SlotRepository>,
    timetables: Arc<TimetableService>,
    max_generation_days: u32,
}

impl SlotGenerator {
    pub fn new(
        slots: Arc<dyn SlotRepository>,
        timetables: Arc<TimetableService>,
        max_generation_days: u32,
    ) -> Self {
        Self { slots, timetables, max_generation_days }
    }

    pub fn validate(&self, request: &GenerationRequest) -> Result<(), SlotError> {
        if request.end_date < request.start_date {
            return Err(SlotError::Validation(format!(
                "end_date {} is before start_date {}",
                request.end_date, request.start_date
            )));
        }
        if request.day_count() > i64::from(self.max_generation_days) {
            return Err(SlotError::Validation(format!(
                "date range spans {} days, at most {} allowed",
                request.day_count(),
                self.max_generation_days
            )));
        }
        if request.slot_duration_minutes < MIN_SLOT_DURATION_MINUTES {
            return Err(SlotError::Validation(format!(
                "slot_duration_minutes must be at least {}",
                MIN_SLOT_DURATION_MINUTES
            )));
        }
        if request.slot_duration_minutes > i64::from(TimeOfDay::MINUTES_PER_DAY) {
            return Err(SlotError::Validation("slot_duration_minutes exceeds one day".to_string()));
        }
        if request.max_concurrent_appointments < 1 || request.max_concurrent_appointments > i64::from(u32::MAX) {
            return Err(SlotError::Validation(
                "max_concurrent_appointments must be at least 1".to_string(),
            ));
        }
        if let Some(fallback) = &request.fallback {
            match fallback.window() {
                Some((start, end)) if start < end => {}
                _ => {
                    return Err(SlotError::Validation(
                        "fallback day_end_time must be after day_start_time".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Creates every missing slot for the request. Slots whose key already
    /// exists are skipped, so re-running a request creates nothing.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, SlotError> {
        self.validate(request)?;

        let owner = request.timetable_owner();
        let entries = self.timetables.active_entries(owner).await?;
        let fallback = request.fallback.as_ref();

        if entries.is_empty() && fallback.is_none() {
            info!("No active timetable for {} and no fallback, nothing to generate", owner);
            return Ok(GenerationResult { created: 0, skipped: 0, slots: Vec::new() });
        }

        let duration = request.slot_duration_minutes as u32;
        let mut result = GenerationResult { created: 0, skipped: 0, slots: Vec::new() };

        for date in request.dates() {
            let windows = day_windows(&entries, fallback, DayOfWeek::from(date.weekday()));
            let candidates = build_day(request, date, &windows, duration);
            if candidates.is_empty() {
                continue;
            }

            let (unique, duplicates) = dedupe(candidates);
            let outcome = self.slots.insert_batch(unique).await?;
            debug!("{}: {} created, {} skipped", date, outcome.created.len(), outcome.skipped + duplicates);

            result.created += outcome.created.len();
            result.skipped += outcome.skipped + duplicates;
            result.slots.extend(outcome.created);
        }

        info!(
            "Generated {} slots for {} between {} and {} ({} skipped)",
            result.created, owner, request.start_date, request.end_date, result.skipped
        );
        Ok(result)
    }
}

/// Windows that apply on `day`. The fallback fills in only for weekdays
/// without an active timetable entry.
pub fn day_windows(
    entries: &[TimetableEntry],
    fallback: Option<&FallbackSchedule>,
    day: DayOfWeek,
) -> Vec<(TimeOfDay, TimeOfDay)> {
    let scheduled: Vec<(TimeOfDay, TimeOfDay)> = entries
        .iter()
        .filter(|entry| entry.is_active && entry.day_of_week == day)
        .map(|entry| (entry.start_time, entry.end_time))
        .collect();
    if !scheduled.is_empty() {
        return scheduled;
    }

    match fallback {
        Some(fallback) if fallback.days_of_week.contains(&day) => {
            fallback.window().into_iter().collect()
        }
        _ => Vec::new(),
    }
}

/// Consecutive `[t, t + duration)` intervals. A trailing remainder shorter
/// than `duration` is dropped.
pub fn partition(start: TimeOfDay, end: TimeOfDay, duration: u32) -> Vec<(TimeOfDay, TimeOfDay)> {
    let mut intervals = Vec::new();
    if duration == 0 {
        return intervals;
    }

    let mut cursor = start.total_minutes();
    while cursor + duration <= end.total_minutes() {
        if let (Some(from), Some(to)) = (
            TimeOfDay::from_total_minutes(cursor),
            TimeOfDay::from_total_minutes(cursor + duration),
        ) {
            intervals.push((from, to));
        }
        cursor += duration;
    }
    intervals
}

fn build_day(
    request: &GenerationRequest,
    date: NaiveDate,
    windows: &[(TimeOfDay, TimeOfDay)],
    duration: u32,
) -> Vec<Slot> {
    let now = Utc::now();
    windows
        .iter()
        .flat_map(|(start, end)| partition(*start, *end, duration))
        .map(|(start_time, end_time)| Slot {
            id: Uuid::new_v4(),
            clinic_id: request.clinic_id,
            doctor_id: request.slot_doctor_id(),
            service_id: request.service_id,
            slot_date: date,
            start_time,
            end_time,
            status: SlotStatus::Available,
            max_concurrent_appointments: request.max_concurrent_appointments as u32,
            current_appointment_count: 0,
            is_clinic_level: request.clinic_level(),
            created_at: now,
            updated_at: now,
        })
        .collect()
}

fn dedupe(candidates: Vec<Slot>) -> (Vec<Slot>, usize) {
    let mut seen = HashSet::new();
    let total = candidates.len();
    let unique: Vec<Slot> = candidates.into_iter().filter(|slot| seen.insert(slot.key())).collect();
    let duplicates = total - unique.len();
    (unique, duplicates)
}
