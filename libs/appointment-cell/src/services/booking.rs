// libs/appointment-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use slot_cell::models::{AvailabilityQuery, Slot, UnavailableReason};
use slot_cell::services::{AvailabilityResolver, BookingAllocator, SlotRepository};
use slot_cell::SlotError;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, BookingCommand};
use crate::services::store::AppointmentRepository;

pub struct AppointmentBookingService {
    slots: Arc<dyn SlotRepository>,
    allocator: Arc<BookingAllocator>,
    resolver: Arc<AvailabilityResolver>,
    appointments: Arc<dyn AppointmentRepository>,
    doctor_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl AppointmentBookingService {
    pub fn new(
        slots: Arc<dyn SlotRepository>,
        allocator: Arc<BookingAllocator>,
        resolver: Arc<AvailabilityResolver>,
        appointments: Arc<dyn AppointmentRepository>,
    ) -> Self {
        Self {
            slots,
            allocator,
            resolver,
            appointments,
            doctor_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn slot(&self, slot_id: Uuid) -> Result<Slot, AppointmentError> {
        Ok(self.slots.get(slot_id).await?)
    }

    /// Reserves a place on the slot, then records the appointment. The
    /// reservation is released again if the appointment cannot be stored.
    pub async fn book(&self, command: BookingCommand) -> Result<Appointment, AppointmentError> {
        let slot = self.slots.get(command.slot_id).await?;
        let doctor_id = resolve_doctor(&slot, command.doctor_id)?;

        // Bookings for one doctor run one at a time so the free-doctor check holds until the insert
        let doctor_lock = self.doctor_lock(doctor_id).await;
        let _guard = doctor_lock.lock().await;
        self.ensure_doctor_free(&slot, doctor_id).await?;

        let appointment_id = Uuid::new_v4();
        self.allocator.reserve(slot.id, appointment_id).await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: appointment_id,
            slot_id: slot.id,
            clinic_id: slot.clinic_id,
            doctor_id,
            patient_id: command.patient_id,
            status: AppointmentStatus::Booked,
            notes: command.notes,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        match self.appointments.insert(appointment).await {
            Ok(stored) => {
                info!(
                    "Appointment {} booked on slot {} for patient {}",
                    stored.id, stored.slot_id, stored.patient_id
                );
                Ok(stored)
            }
            Err(err) => {
                warn!("Storing appointment {} failed, releasing slot {}: {}", appointment_id, slot.id, err);
                if let Err(release_err) = self.allocator.release(slot.id, appointment_id).await {
                    error!(
                        "Slot {} keeps an orphaned reservation for appointment {}: {}",
                        slot.id, appointment_id, release_err
                    );
                }
                Err(err)
            }
        }
    }

    /// Cancels a booked appointment and frees its place on the slot.
    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> Result<Appointment, AppointmentError> {
        let cancelled = self
            .appointments
            .transition(id, AppointmentStatus::Booked, AppointmentStatus::Cancelled, reason)
            .await?;

        if let Err(err) = self.allocator.release(cancelled.slot_id, cancelled.id).await {
            error!(
                "Appointment {} cancelled but slot {} was not released: {}",
                cancelled.id, cancelled.slot_id, err
            );
        }

        info!("Appointment {} cancelled", cancelled.id);
        Ok(cancelled)
    }

    pub async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments.get(id).await
    }

    pub async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        self.appointments.list(filter).await
    }

    async fn doctor_lock(&self, doctor_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.doctor_locks.lock().await;
        Arc::clone(locks.entry(doctor_id).or_default())
    }

    /// Clinic-level slots need a clinic doctor who is free for the window.
    /// A doctor's own slot only has to avoid clashing with their
    /// clinic-level bookings. Slots that are already full are left for
    /// `reserve` to reject.
    async fn ensure_doctor_free(&self, slot: &Slot, doctor_id: Uuid) -> Result<(), AppointmentError> {
        if !slot.can_accept_booking() {
            return Ok(());
        }

        let query = AvailabilityQuery {
            clinic_id: slot.clinic_id,
            date: slot.slot_date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            service_id: slot.service_id,
        };

        if !slot.is_clinic_level {
            if self.resolver.holds_clinic_booking(doctor_id, &query).await? {
                warn!("Doctor {} already booked during slot {}", doctor_id, slot.id);
                return Err(unavailable(slot, UnavailableReason::FullyBooked));
            }
            return Ok(());
        }

        match self.resolver.doctor_availability(&query, doctor_id).await? {
            None => Err(AppointmentError::Validation(format!(
                "doctor {} does not take bookings for slot {} at clinic {}",
                doctor_id, slot.id, slot.clinic_id
            ))),
            Some(result) if result.is_available => {
                debug!("Doctor {} is free for clinic slot {}", doctor_id, slot.id);
                Ok(())
            }
            Some(result) => {
                let reason = result.unavailability_reason.unwrap_or(UnavailableReason::OutsideSchedule);
                warn!("Doctor {} rejected for slot {}: {}", doctor_id, slot.id, reason.as_str());
                Err(unavailable(slot, reason))
            }
        }
    }
}

fn unavailable(slot: &Slot, reason: UnavailableReason) -> AppointmentError {
    AppointmentError::Slot(SlotError::SlotUnavailable { slot_id: slot.id, reason })
}

/// Clinic-level slots are booked against a named doctor; doctor slots
/// belong to their own doctor.
fn resolve_doctor(slot: &Slot, requested: Option<Uuid>) -> Result<Uuid, AppointmentError> {
    match (slot.is_clinic_level, slot.doctor_id, requested) {
        (true, _, Some(doctor_id)) => Ok(doctor_id),
        (true, _, None) => Err(AppointmentError::Validation(
            "doctor_id is required for clinic-level slots".to_string(),
        )),
        (false, Some(owner), Some(doctor_id)) if owner != doctor_id => Err(AppointmentError::Validation(
            format!("slot {} belongs to doctor {}", slot.id, owner),
        )),
        (false, Some(owner), _) => Ok(owner),
        (false, None, _) => Err(AppointmentError::Validation(format!(
            "slot {} has no doctor assigned",
            slot.id
        ))),
    }
}
