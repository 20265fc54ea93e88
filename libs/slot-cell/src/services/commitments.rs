use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SlotError;

/// Appointments a doctor already holds. Clinic-level slots only count their
/// occupancy, so the doctor attached to each booking lives with whoever
/// records appointments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DoctorCommitments: Send + Sync {
    /// Slot ids of the doctor's active (booked) appointments.
    async fn booked_slot_ids(&self, doctor_id: Uuid) -> Result<Vec<Uuid>, SlotError>;
}
