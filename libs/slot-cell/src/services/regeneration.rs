use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::error::SlotError;
use crate::models::{
    GenerationRequest, RegenerationRequest, RegenerationResult, Slot, SlotDefaults, SlotFilter,
    SlotStatus,
};
use crate::services::generator::SlotGenerator;
use crate::services::store::SlotRepository;

/// Rebuilds future open slots after a timetable change. Slots holding a
/// reservation, and anything completed or cancelled, are left alone.
pub struct RegenerationCoordinator {
    slots: Arc<dyn SlotRepository>,
    generator: Arc<SlotGenerator>,
    defaults: SlotDefaults,
}

impl RegenerationCoordinator {
    pub fn new(slots: Arc<dyn SlotRepository>, generator: Arc<SlotGenerator>, defaults: SlotDefaults) -> Self {
        Self { slots, generator, defaults }
    }

    pub async fn regenerate_future(&self, request: &RegenerationRequest) -> Result<RegenerationResult, SlotError> {
        self.regenerate_future_from(Local::now().date_naive(), request).await
    }

    pub async fn regenerate_future_from(
        &self,
        today: NaiveDate,
        request: &RegenerationRequest,
    ) -> Result<RegenerationResult, SlotError> {
        let end_date = request.end_date.unwrap_or_else(|| self.defaults.horizon_end(today));
        if end_date < today {
            return Err(SlotError::Validation(format!(
                "end_date {} is in the past (today is {})",
                end_date, today
            )));
        }

        let filter = SlotFilter {
            date_from: Some(today),
            statuses: Some(vec![SlotStatus::Available]),
            ..SlotFilter::for_owner(request.clinic_id, request.doctor_id)
        };
        let stale: Vec<Slot> = self
            .slots
            .list(filter)
            .await?
            .into_iter()
            .filter(|slot| slot.current_appointment_count == 0)
            .collect();

        let (duration, capacity) = match prevailing_shape(&stale) {
            Some((duration, capacity)) => (i64::from(duration), i64::from(capacity)),
            None => (
                i64::from(self.defaults.slot_duration_minutes),
                i64::from(self.defaults.max_concurrent_appointments),
            ),
        };

        let generation = GenerationRequest {
            clinic_id: request.clinic_id,
            doctor_id: request.doctor_id,
            service_id: request.service_id.or_else(|| stale.iter().find_map(|slot| slot.service_id)),
            is_clinic_level: request.doctor_id.is_none(),
            start_date: today,
            end_date,
            slot_duration_minutes: request.slot_duration_minutes.unwrap_or(duration),
            max_concurrent_appointments: request.max_concurrent_appointments.unwrap_or(capacity),
            fallback: request.fallback.clone(),
        };
        // Nothing is deleted unless the replacement request is valid
        self.generator.validate(&generation)?;

        let deleted = self
            .slots
            .delete_available(stale.iter().map(|slot| slot.id).collect())
            .await?;
        let generated = self.generator.generate(&generation).await?;

        info!(
            "Regenerated {} for clinic {}: {} deleted, {} created, {} kept",
            request.doctor_id.map_or_else(|| "clinic slots".to_string(), |d| format!("doctor {}", d)),
            request.clinic_id,
            deleted.len(),
            generated.created,
            generated.skipped
        );

        Ok(RegenerationResult {
            deleted: deleted.len(),
            regenerated: generated.created,
            skipped: generated.skipped,
            slots: generated.slots,
        })
    }
}

/// Most common `(duration, capacity)` among `slots`, ties broken towards the
/// smaller duration.
fn prevailing_shape(slots: &[Slot]) -> Option<(u32, u32)> {
    let mut counts: HashMap<(u32, u32), usize> = HashMap::new();
    for slot in slots {
        *counts.entry((slot.duration_minutes(), slot.max_concurrent_appointments)).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(shape_a, count_a), (shape_b, count_b)| count_a.cmp(count_b).then(shape_b.cmp(shape_a)))
        .map(|(shape, _)| shape)
}
