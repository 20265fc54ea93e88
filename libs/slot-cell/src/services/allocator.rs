use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SlotError;
use crate::models::{Slot, UnavailableReason};
use crate::services::store::SlotRepository;

/// Reserves and releases single places on a slot. All concurrency control
/// lives in [`SlotRepository::adjust_occupancy`].
pub struct BookingAllocator {
    slots: Arc<dyn SlotRepository>,
}

impl BookingAllocator {
    pub fn new(slots: Arc<dyn SlotRepository>) -> Self {
        Self { slots }
    }

    pub async fn reserve(&self, slot_id: Uuid, appointment_ref: Uuid) -> Result<Slot, SlotError> {
        match self.slots.adjust_occupancy(slot_id, 1).await {
            Ok(slot) => {
                info!(
                    "Reserved slot {} for appointment {} ({}/{})",
                    slot_id, appointment_ref, slot.current_appointment_count, slot.max_concurrent_appointments
                );
                Ok(slot)
            }
            Err(SlotError::CapacityExceeded { .. }) => {
                warn!("Slot {} is full, appointment {} rejected", slot_id, appointment_ref);
                Err(SlotError::SlotUnavailable { slot_id, reason: UnavailableReason::FullyBooked })
            }
            Err(SlotError::SlotNotBookable { status, .. }) => {
                warn!("Slot {} is {}, appointment {} rejected", slot_id, status, appointment_ref);
                Err(SlotError::SlotUnavailable { slot_id, reason: UnavailableReason::NotBookable })
            }
            Err(err) => Err(err),
        }
    }

    pub async fn release(&self, slot_id: Uuid, appointment_ref: Uuid) -> Result<Slot, SlotError> {
        match self.slots.adjust_occupancy(slot_id, -1).await {
            Ok(slot) => {
                info!(
                    "Released slot {} from appointment {} ({}/{})",
                    slot_id, appointment_ref, slot.current_appointment_count, slot.max_concurrent_appointments
                );
                Ok(slot)
            }
            Err(SlotError::CapacityExceeded { .. }) => Err(SlotError::InvalidState(format!(
                "slot {} has no reservation to release",
                slot_id
            ))),
            Err(SlotError::SlotNotBookable { status, .. }) => Err(SlotError::InvalidState(format!(
                "slot {} is {} and cannot be released",
                slot_id, status
            ))),
            Err(err) => Err(err),
        }
    }
}
