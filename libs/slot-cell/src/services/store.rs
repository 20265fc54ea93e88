use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::SlotError;
use crate::models::{sort_slots, Slot, SlotFilter, SlotKey, SlotStatus};

#[derive(Debug, Clone, Default)]
pub struct InsertOutcome {
    pub created: Vec<Slot>,
    pub skipped: usize,
}

/// Persistence seam for slots.
///
/// `adjust_occupancy` is the only way occupancy changes and must be atomic
/// per slot: concurrent adjustments on one slot serialize, and the capacity
/// bound is checked against the value actually being replaced.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Inserts slots whose key is not taken yet. Existing keys are skipped
    /// and left untouched.
    async fn insert_batch(&self, slots: Vec<Slot>) -> Result<InsertOutcome, SlotError>;

    async fn get(&self, id: Uuid) -> Result<Slot, SlotError>;

    /// Ordered by date, start time, doctor.
    async fn list(&self, filter: SlotFilter) -> Result<Vec<Slot>, SlotError>;

    async fn adjust_occupancy(&self, id: Uuid, delta: i32) -> Result<Slot, SlotError>;

    async fn set_status(&self, id: Uuid, status: SlotStatus) -> Result<Slot, SlotError>;

    /// Deletes a slot nobody holds.
    async fn delete(&self, id: Uuid) -> Result<(), SlotError>;

    /// Deletes those of `ids` that are still available with zero occupancy,
    /// checked at delete time. Returns the ids actually removed.
    async fn delete_available(&self, ids: Vec<Uuid>) -> Result<Vec<Uuid>, SlotError>;
}

/// Occupancy change shared by every store: status follows the count.
pub fn apply_occupancy(slot: &Slot, delta: i32) -> Result<Slot, SlotError> {
    if !slot.status.is_bookable() {
        return Err(SlotError::SlotNotBookable { slot_id: slot.id, status: slot.status });
    }

    let requested = i64::from(slot.current_appointment_count) + i64::from(delta);
    if requested < 0 || requested > i64::from(slot.max_concurrent_appointments) {
        return Err(SlotError::CapacityExceeded {
            slot_id: slot.id,
            requested,
            max: slot.max_concurrent_appointments,
        });
    }

    let mut updated = slot.clone();
    updated.current_appointment_count = requested as u32;
    updated.status = if requested > 0 { SlotStatus::Booked } else { SlotStatus::Available };
    updated.updated_at = Utc::now();
    Ok(updated)
}

/// Administrative status change. Only the terminal states can be requested;
/// available and booked follow occupancy.
pub fn apply_status(slot: &Slot, status: SlotStatus) -> Result<Slot, SlotError> {
    if slot.status == status {
        return Ok(slot.clone());
    }

    match status {
        SlotStatus::Cancelled => {
            if slot.status != SlotStatus::Available || slot.current_appointment_count > 0 {
                return Err(SlotError::InvalidState(format!(
                    "slot {} has {} reservation(s) and cannot be cancelled",
                    slot.id, slot.current_appointment_count
                )));
            }
        }
        SlotStatus::Completed => {
            if slot.status != SlotStatus::Booked {
                return Err(SlotError::InvalidState(format!(
                    "slot {} is {} and cannot be completed",
                    slot.id, slot.status
                )));
            }
        }
        SlotStatus::Available | SlotStatus::Booked => {
            return Err(SlotError::InvalidState(format!(
                "{} is derived from occupancy and cannot be set directly",
                status
            )));
        }
    }

    let mut updated = slot.clone();
    updated.status = status;
    updated.updated_at = Utc::now();
    Ok(updated)
}

struct SlotCell {
    slot: Slot,
    removed: bool,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<Uuid, Arc<Mutex<SlotCell>>>,
    by_key: HashMap<SlotKey, Uuid>,
}

/// Process-local store. Each slot sits behind its own mutex so occupancy
/// changes on different slots never contend. Removal marks the cell so a
/// caller already holding it sees `NotFound`.
#[derive(Default)]
pub struct InMemorySlotRepository {
    tables: RwLock<Tables>,
}

impl InMemorySlotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn cell(&self, id: Uuid) -> Result<Arc<Mutex<SlotCell>>, SlotError> {
        self.tables
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| SlotError::NotFound(id.to_string()))
    }

    async fn modify<F>(&self, id: Uuid, change: F) -> Result<Slot, SlotError>
    where
        F: FnOnce(&Slot) -> Result<Slot, SlotError> + Send,
    {
        let cell = self.cell(id).await?;
        let mut guard = cell.lock().await;
        if guard.removed {
            return Err(SlotError::NotFound(id.to_string()));
        }

        let updated = change(&guard.slot)?;
        guard.slot = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl SlotRepository for InMemorySlotRepository {
    async fn insert_batch(&self, slots: Vec<Slot>) -> Result<InsertOutcome, SlotError> {
        let mut tables = self.tables.write().await;
        let mut outcome = InsertOutcome::default();

        for slot in slots {
            let key = slot.key();
            if tables.by_key.contains_key(&key) || tables.by_id.contains_key(&slot.id) {
                outcome.skipped += 1;
                continue;
            }

            tables.by_key.insert(key, slot.id);
            tables.by_id.insert(slot.id, Arc::new(Mutex::new(SlotCell { slot: slot.clone(), removed: false })));
            outcome.created.push(slot);
        }

        Ok(outcome)
    }

    async fn get(&self, id: Uuid) -> Result<Slot, SlotError> {
        let cell = self.cell(id).await?;
        let guard = cell.lock().await;
        if guard.removed {
            return Err(SlotError::NotFound(id.to_string()));
        }
        Ok(guard.slot.clone())
    }

    async fn list(&self, filter: SlotFilter) -> Result<Vec<Slot>, SlotError> {
        let cells: Vec<Arc<Mutex<SlotCell>>> = self.tables.read().await.by_id.values().cloned().collect();

        let mut found = Vec::new();
        for cell in cells {
            let guard = cell.lock().await;
            if !guard.removed && filter.matches(&guard.slot) {
                found.push(guard.slot.clone());
            }
        }

        sort_slots(&mut found);
        Ok(found)
    }

    async fn adjust_occupancy(&self, id: Uuid, delta: i32) -> Result<Slot, SlotError> {
        self.modify(id, |slot| apply_occupancy(slot, delta)).await
    }

    async fn set_status(&self, id: Uuid, status: SlotStatus) -> Result<Slot, SlotError> {
        self.modify(id, |slot| apply_status(slot, status)).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), SlotError> {
        let mut tables = self.tables.write().await;
        let cell = tables
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| SlotError::NotFound(id.to_string()))?;

        let mut guard = cell.lock().await;
        if guard.slot.current_appointment_count > 0 {
            return Err(SlotError::InvalidState(format!(
                "slot {} still holds {} reservation(s)",
                id, guard.slot.current_appointment_count
            )));
        }

        guard.removed = true;
        tables.by_key.remove(&guard.slot.key());
        tables.by_id.remove(&id);
        Ok(())
    }

    async fn delete_available(&self, ids: Vec<Uuid>) -> Result<Vec<Uuid>, SlotError> {
        let mut tables = self.tables.write().await;
        let mut deleted = Vec::new();

        for id in ids {
            let Some(cell) = tables.by_id.get(&id).cloned() else {
                continue;
            };

            let mut guard = cell.lock().await;
            if guard.slot.status != SlotStatus::Available || guard.slot.current_appointment_count > 0 {
                continue;
            }

            guard.removed = true;
            tables.by_key.remove(&guard.slot.key());
            tables.by_id.remove(&id);
            deleted.push(id);
        }

        Ok(deleted)
    }
}
