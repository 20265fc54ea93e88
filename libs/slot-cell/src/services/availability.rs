use std::sync::Arc;

use chrono::Datelike;
use futures::future::{join_all, try_join_all};
use tracing::debug;
use uuid::Uuid;

use timetable_cell::models::{DayOfWeek, TimetableOwner, TimetableQuery};
use timetable_cell::TimetableService;

use crate::error::SlotError;
use crate::models::{AvailabilityQuery, AvailableDoctor, Slot, SlotFilter, SlotStatus, UnavailableReason};
use crate::services::commitments::DoctorCommitments;
use crate::services::directory::{ClinicDoctor, DoctorDirectory};
use crate::services::store::SlotRepository;

/// Answers which of a clinic's doctors can take a given window.
pub struct AvailabilityResolver {
    directory: Arc<dyn DoctorDirectory>,
    timetables: Arc<TimetableService>,
    slots: Arc<dyn SlotRepository>,
    commitments: Option<Arc<dyn DoctorCommitments>>,
}

impl AvailabilityResolver {
    pub fn new(
        directory: Arc<dyn DoctorDirectory>,
        timetables: Arc<TimetableService>,
        slots: Arc<dyn SlotRepository>,
    ) -> Self {
        Self { directory, timetables, slots, commitments: None }
    }

    /// Also treats doctors booked through clinic-level slots as taken.
    pub fn with_commitments(mut self, commitments: Arc<dyn DoctorCommitments>) -> Self {
        self.commitments = Some(commitments);
        self
    }

    /// One result per clinic doctor offering the service, ordered by doctor id.
    pub async fn resolve(&self, query: &AvailabilityQuery) -> Result<Vec<AvailableDoctor>, SlotError> {
        validate_window(query)?;

        let mut doctors = self.directory.clinic_doctors(query.clinic_id, query.service_id).await?;
        doctors.sort_by_key(|doctor| doctor.doctor_id);

        let clinic_open = self.clinic_open(query).await?;
        let results = try_join_all(
            doctors.iter().map(|doctor| self.resolve_doctor(doctor, query, clinic_open)),
        )
        .await?;

        debug!(
            "{} of {} doctors available at clinic {} on {} {}-{}",
            results.iter().filter(|r| r.is_available).count(),
            results.len(),
            query.clinic_id,
            query.date,
            query.start_time,
            query.end_time
        );
        Ok(results)
    }

    /// Availability of a single doctor, or `None` when the doctor does not
    /// serve the clinic for the requested service.
    pub async fn doctor_availability(
        &self,
        query: &AvailabilityQuery,
        doctor_id: Uuid,
    ) -> Result<Option<AvailableDoctor>, SlotError> {
        validate_window(query)?;

        let doctors = self.directory.clinic_doctors(query.clinic_id, query.service_id).await?;
        let Some(doctor) = doctors.into_iter().find(|d| d.doctor_id == doctor_id) else {
            return Ok(None);
        };

        let clinic_open = self.clinic_open(query).await?;
        self.resolve_doctor(&doctor, query, clinic_open).await.map(Some)
    }

    /// True when the doctor already holds a booked clinic-level slot that
    /// overlaps the window.
    pub async fn holds_clinic_booking(&self, doctor_id: Uuid, query: &AvailabilityQuery) -> Result<bool, SlotError> {
        let Some(commitments) = &self.commitments else {
            return Ok(false);
        };

        let slot_ids = commitments.booked_slot_ids(doctor_id).await?;
        let slots = join_all(slot_ids.into_iter().map(|id| self.slots.get(id))).await;
        for slot in slots {
            match slot {
                Ok(slot) if slot.is_clinic_level
                    && slot.slot_date == query.date
                    && slot.overlaps(query.start_time, query.end_time) =>
                {
                    return Ok(true);
                }
                Ok(_) | Err(SlotError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(false)
    }

    /// Whether the clinic runs a bookable clinic-level slot covering the window.
    async fn clinic_open(&self, query: &AvailabilityQuery) -> Result<bool, SlotError> {
        let clinic_slots = self
            .slots
            .list(SlotFilter::for_owner(query.clinic_id, None).on_date(query.date))
            .await?;
        Ok(clinic_slots.iter().any(|slot| {
            slot.can_accept_booking()
                && slot.covers(query.start_time, query.end_time)
                && (slot.service_id.is_none() || slot.service_id == query.service_id)
        }))
    }

    async fn resolve_doctor(
        &self,
        doctor: &ClinicDoctor,
        query: &AvailabilityQuery,
        clinic_open: bool,
    ) -> Result<AvailableDoctor, SlotError> {
        let day = DayOfWeek::from(query.date.weekday());
        let entries = self
            .timetables
            .list_entries(TimetableOwner::doctor(doctor.doctor_id), &TimetableQuery::default())
            .await?;

        // A doctor without any timetable is never bookable, even at an open clinic
        let in_schedule = !entries.is_empty()
            && (clinic_open
                || entries.iter().any(|entry| {
                    entry.is_active
                        && entry.day_of_week == day
                        && entry.covers(query.start_time, query.end_time)
                }));
        if !in_schedule {
            return Ok(AvailableDoctor::unavailable(doctor.doctor_id, UnavailableReason::OutsideSchedule));
        }

        let own_slots = self
            .slots
            .list(SlotFilter { doctor_id: Some(doctor.doctor_id), ..SlotFilter::default() }.on_date(query.date))
            .await?;
        if own_slots.iter().any(|slot| blocks(slot, query))
            || self.holds_clinic_booking(doctor.doctor_id, query).await?
        {
            return Ok(AvailableDoctor::unavailable(doctor.doctor_id, UnavailableReason::FullyBooked));
        }

        Ok(AvailableDoctor::available(doctor.doctor_id))
    }
}

fn validate_window(query: &AvailabilityQuery) -> Result<(), SlotError> {
    if query.end_time <= query.start_time {
        return Err(SlotError::Validation(format!(
            "end_time {} must be after start_time {}",
            query.end_time, query.start_time
        )));
    }
    Ok(())
}

/// Overlapping slot that is full or already completed.
fn blocks(slot: &Slot, query: &AvailabilityQuery) -> bool {
    slot.overlaps(query.start_time, query.end_time)
        && match slot.status {
            SlotStatus::Completed => true,
            SlotStatus::Booked => !slot.has_capacity(),
            SlotStatus::Available | SlotStatus::Cancelled => false,
        }
}
