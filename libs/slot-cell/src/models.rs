// libs/slot-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use timetable_cell::models::{DayOfWeek, TimeOfDay, TimeOfDayView, TimetableOwner};

// ==============================================================================
// SLOT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Cancelled,
    Completed,
}

impl SlotStatus {
    /// Cancelled and completed slots never accept occupancy changes.
    pub fn is_bookable(&self) -> bool {
        matches!(self, SlotStatus::Available | SlotStatus::Booked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
            SlotStatus::Cancelled => "cancelled",
            SlotStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub slot_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub status: SlotStatus,
    pub max_concurrent_appointments: u32,
    pub current_appointment_count: u32,
    pub is_clinic_level: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    pub fn key(&self) -> SlotKey {
        SlotKey {
            clinic_id: self.clinic_id,
            doctor_id: if self.is_clinic_level { None } else { self.doctor_id },
            slot_date: self.slot_date,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.max_concurrent_appointments.saturating_sub(self.current_appointment_count)
    }

    pub fn has_capacity(&self) -> bool {
        self.current_appointment_count < self.max_concurrent_appointments
    }

    /// Bookable status with at least one free place.
    pub fn can_accept_booking(&self) -> bool {
        self.status.is_bookable() && self.has_capacity()
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end_time.total_minutes().saturating_sub(self.start_time.total_minutes())
    }

    pub fn overlaps(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.start_time < end && start < self.end_time
    }

    pub fn covers(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.start_time <= start && end <= self.end_time
    }

    pub fn formatted_time_slot(&self) -> String {
        format!("{} - {}", self.start_time.to_12h(), self.end_time.to_12h())
    }
}

/// Identity used for idempotent generation: one slot per owner and interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub slot_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

/// API rendering of a slot.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub slot_date: NaiveDate,
    pub start_time: TimeOfDayView,
    pub end_time: TimeOfDayView,
    pub formatted_time_slot: String,
    pub status: SlotStatus,
    pub max_concurrent_appointments: u32,
    pub current_appointment_count: u32,
    pub remaining_capacity: u32,
    pub is_clinic_level: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Slot> for SlotView {
    fn from(slot: &Slot) -> Self {
        Self {
            id: slot.id,
            clinic_id: slot.clinic_id,
            doctor_id: slot.doctor_id,
            service_id: slot.service_id,
            slot_date: slot.slot_date,
            start_time: slot.start_time.view(),
            end_time: slot.end_time.view(),
            formatted_time_slot: slot.formatted_time_slot(),
            status: slot.status,
            max_concurrent_appointments: slot.max_concurrent_appointments,
            current_appointment_count: slot.current_appointment_count,
            remaining_capacity: slot.remaining_capacity(),
            is_clinic_level: slot.is_clinic_level,
            created_at: slot.created_at,
            updated_at: slot.updated_at,
        }
    }
}

pub fn to_views(slots: &[Slot]) -> Vec<SlotView> {
    slots.iter().map(SlotView::from).collect()
}

// ==============================================================================
// QUERY MODELS
// ==============================================================================

/// Store-level selection. Every `Some` field must match.
#[derive(Debug, Clone, Default)]
pub struct SlotFilter {
    pub clinic_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub statuses: Option<Vec<SlotStatus>>,
    pub clinic_level: Option<bool>,
    pub available_only: bool,
}

impl SlotFilter {
    /// Slots owned by a clinic (`doctor_id = None`) or by one of its doctors.
    pub fn for_owner(clinic_id: Uuid, doctor_id: Option<Uuid>) -> Self {
        Self {
            clinic_id: Some(clinic_id),
            doctor_id,
            clinic_level: Some(doctor_id.is_none()),
            ..Self::default()
        }
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self.date_to = Some(date);
        self
    }

    pub fn matches(&self, slot: &Slot) -> bool {
        if self.clinic_id.is_some_and(|id| slot.clinic_id != id) {
            return false;
        }
        if self.doctor_id.is_some() && slot.doctor_id != self.doctor_id {
            return false;
        }
        if self.service_id.is_some() && slot.service_id != self.service_id {
            return false;
        }
        if self.date_from.is_some_and(|from| slot.slot_date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| slot.slot_date > to) {
            return false;
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&slot.status) {
                return false;
            }
        }
        if self.clinic_level.is_some_and(|level| slot.is_clinic_level != level) {
            return false;
        }
        if self.available_only && !slot.can_accept_booking() {
            return false;
        }
        true
    }
}

pub fn sort_slots(slots: &mut [Slot]) {
    slots.sort_by(|a, b| {
        a.slot_date
            .cmp(&b.slot_date)
            .then(a.start_time.cmp(&b.start_time))
            .then(a.doctor_id.cmp(&b.doctor_id))
            .then(a.id.cmp(&b.id))
    });
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotListQuery {
    pub clinic_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub slot_date: Option<NaiveDate>,
    #[serde(alias = "dateFrom")]
    pub date_from: Option<NaiveDate>,
    #[serde(alias = "dateTo")]
    pub date_to: Option<NaiveDate>,
    pub status: Option<SlotStatus>,
    pub available_only: Option<bool>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableDoctorsQuery {
    pub clinic_id: Uuid,
    pub slot_date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSlotStatusRequest {
    pub status: SlotStatus,
}

// ==============================================================================
// GENERATION MODELS
// ==============================================================================

/// Weekly shape used when the owner has no timetable at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackSchedule {
    #[serde(default)]
    pub days_of_week: Vec<DayOfWeek>,
    pub day_start_time: Option<TimeOfDay>,
    pub day_end_time: Option<TimeOfDay>,
}

pub const DEFAULT_DAY_START_MINUTES: u32 = 9 * 60;
pub const DEFAULT_DAY_END_MINUTES: u32 = 17 * 60;

impl FallbackSchedule {
    /// Daily window, 09:00-17:00 when either bound is missing.
    pub fn window(&self) -> Option<(TimeOfDay, TimeOfDay)> {
        let start = match self.day_start_time {
            Some(start) => start,
            None => TimeOfDay::from_total_minutes(DEFAULT_DAY_START_MINUTES)?,
        };
        let end = match self.day_end_time {
            Some(end) => end,
            None => TimeOfDay::from_total_minutes(DEFAULT_DAY_END_MINUTES)?,
        };
        Some((start, end))
    }
}

fn default_capacity() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    #[serde(default)]
    pub is_clinic_level: bool,
    #[serde(alias = "date_from")]
    pub start_date: NaiveDate,
    #[serde(alias = "date_to")]
    pub end_date: NaiveDate,
    pub slot_duration_minutes: i64,
    #[serde(default = "default_capacity")]
    pub max_concurrent_appointments: i64,
    #[serde(default)]
    pub fallback: Option<FallbackSchedule>,
}

impl GenerationRequest {
    /// Without a doctor every request is clinic-level.
    pub fn clinic_level(&self) -> bool {
        self.is_clinic_level || self.doctor_id.is_none()
    }

    pub fn slot_doctor_id(&self) -> Option<Uuid> {
        if self.clinic_level() { None } else { self.doctor_id }
    }

    pub fn timetable_owner(&self) -> TimetableOwner {
        match self.slot_doctor_id() {
            Some(doctor_id) => TimetableOwner::doctor(doctor_id),
            None => TimetableOwner::clinic(self.clinic_id),
        }
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |date| *date <= self.end_date)
    }

    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub created: usize,
    pub skipped: usize,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerationRequest {
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub end_date: Option<NaiveDate>,
    pub slot_duration_minutes: Option<i64>,
    pub max_concurrent_appointments: Option<i64>,
    #[serde(default)]
    pub fallback: Option<FallbackSchedule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegenerationResult {
    pub deleted: usize,
    pub regenerated: usize,
    pub skipped: usize,
    pub slots: Vec<Slot>,
}

/// Defaults applied when a regeneration request leaves the slot shape open.
#[derive(Debug, Clone, Copy)]
pub struct SlotDefaults {
    pub slot_duration_minutes: u32,
    pub max_concurrent_appointments: u32,
    pub horizon_days: u32,
}

impl SlotDefaults {
    pub fn horizon_end(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(i64::from(self.horizon_days))
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnavailableReason {
    #[serde(rename = "outside schedule")]
    OutsideSchedule,
    #[serde(rename = "fully booked")]
    FullyBooked,
    #[serde(rename = "not bookable")]
    NotBookable,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::OutsideSchedule => "outside schedule",
            UnavailableReason::FullyBooked => "fully booked",
            UnavailableReason::NotBookable => "not bookable",
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableDoctor {
    pub doctor_id: Uuid,
    pub is_available: bool,
    pub unavailability_reason: Option<UnavailableReason>,
}

impl AvailableDoctor {
    pub fn available(doctor_id: Uuid) -> Self {
        Self { doctor_id, is_available: true, unavailability_reason: None }
    }

    pub fn unavailable(doctor_id: Uuid, reason: UnavailableReason) -> Self {
        Self { doctor_id, is_available: false, unavailability_reason: Some(reason) }
    }
}

#[derive(Debug, Clone)]
pub struct AvailabilityQuery {
    pub clinic_id: Uuid,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub service_id: Option<Uuid>,
}

impl From<AvailableDoctorsQuery> for AvailabilityQuery {
    fn from(query: AvailableDoctorsQuery) -> Self {
        Self {
            clinic_id: query.clinic_id,
            date: query.slot_date,
            start_time: query.start_time,
            end_time: query.end_time,
            service_id: query.service_id,
        }
    }
}
