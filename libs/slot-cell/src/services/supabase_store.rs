use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, PREFER_IGNORE_DUPLICATES};

use crate::error::SlotError;
use crate::models::{sort_slots, Slot, SlotFilter, SlotStatus};
use crate::services::store::{apply_occupancy, apply_status, InsertOutcome, SlotRepository};

const TABLE: &str = "appointment_slots";
const ON_CONFLICT: &str = "on_conflict=clinic_id,doctor_id,slot_date,start_time,end_time";
const DELETE_CHUNK: usize = 100;

/// Slots in PostgREST. Occupancy changes are compare-and-swap PATCHes keyed
/// on the count and status that were read, retried a bounded number of times.
pub struct SupabaseSlotRepository {
    supabase: SupabaseClient,
    service_key: String,
    max_retries: u32,
}

impl SupabaseSlotRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            service_key: config.supabase_service_role_key.clone(),
            max_retries: config.slot_reserve_max_retries,
        }
    }

    fn token(&self) -> Option<&str> {
        Some(self.service_key.as_str()).filter(|key| !key.is_empty())
    }

    /// Read, apply `change`, write back only if nobody moved the row.
    async fn compare_and_swap<F>(&self, id: Uuid, change: F) -> Result<Slot, SlotError>
    where
        F: Fn(&Slot) -> Result<Slot, SlotError> + Send + Sync,
    {
        for attempt in 0..=self.max_retries {
            let current = self.get(id).await?;
            let updated = change(&current)?;

            let query = format!(
                "id=eq.{}&current_appointment_count=eq.{}&status=eq.{}",
                id, current.current_appointment_count, current.status
            );
            let patch = json!({
                "current_appointment_count": updated.current_appointment_count,
                "status": updated.status,
                "updated_at": updated.updated_at,
            });

            let rows: Vec<Slot> = self.supabase.update(TABLE, &query, patch, self.token()).await?;
            if let Some(stored) = rows.into_iter().next() {
                return Ok(stored);
            }

            warn!("Slot {} changed underneath update (attempt {})", id, attempt + 1);
        }

        Err(SlotError::ConcurrentModification(id))
    }
}

pub fn filter_query(filter: &SlotFilter) -> String {
    let mut parts = Vec::new();

    if let Some(clinic_id) = filter.clinic_id {
        parts.push(format!("clinic_id=eq.{}", clinic_id));
    }
    if let Some(doctor_id) = filter.doctor_id {
        parts.push(format!("doctor_id=eq.{}", doctor_id));
    }
    if let Some(service_id) = filter.service_id {
        parts.push(format!("service_id=eq.{}", service_id));
    }
    if let Some(from) = filter.date_from {
        parts.push(format!("slot_date=gte.{}", from));
    }
    if let Some(to) = filter.date_to {
        parts.push(format!("slot_date=lte.{}", to));
    }

    let statuses = match (&filter.statuses, filter.available_only) {
        (Some(statuses), _) => Some(statuses.clone()),
        (None, true) => Some(vec![SlotStatus::Available, SlotStatus::Booked]),
        (None, false) => None,
    };
    if let Some(statuses) = statuses {
        let list: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        parts.push(format!("status=in.({})", list.join(",")));
    }

    if let Some(level) = filter.clinic_level {
        parts.push(format!("is_clinic_level=is.{}", level));
    }

    parts.push("order=slot_date.asc,start_time.asc".to_string());
    parts.join("&")
}

#[async_trait]
impl SlotRepository for SupabaseSlotRepository {
    async fn insert_batch(&self, slots: Vec<Slot>) -> Result<InsertOutcome, SlotError> {
        if slots.is_empty() {
            return Ok(InsertOutcome::default());
        }

        let attempted = slots.len();
        let created: Vec<Slot> = self.supabase
            .insert(TABLE, ON_CONFLICT, json!(slots), PREFER_IGNORE_DUPLICATES, self.token())
            .await?;

        debug!("Inserted {} of {} slots", created.len(), attempted);
        Ok(InsertOutcome {
            skipped: attempted.saturating_sub(created.len()),
            created,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Slot, SlotError> {
        let query = format!("id=eq.{}", id);
        let rows: Vec<Slot> = self.supabase.select(TABLE, &query, self.token()).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| SlotError::NotFound(id.to_string()))
    }

    async fn list(&self, filter: SlotFilter) -> Result<Vec<Slot>, SlotError> {
        let query = filter_query(&filter);
        let rows: Vec<Slot> = self.supabase.select(TABLE, &query, self.token()).await?;

        // Capacity compares two columns, so finish the filter here
        let mut found: Vec<Slot> = rows.into_iter().filter(|slot| filter.matches(slot)).collect();
        sort_slots(&mut found);
        Ok(found)
    }

    async fn adjust_occupancy(&self, id: Uuid, delta: i32) -> Result<Slot, SlotError> {
        self.compare_and_swap(id, |slot| apply_occupancy(slot, delta)).await
    }

    async fn set_status(&self, id: Uuid, status: SlotStatus) -> Result<Slot, SlotError> {
        self.compare_and_swap(id, |slot| apply_status(slot, status)).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), SlotError> {
        let query = format!("id=eq.{}&current_appointment_count=eq.0", id);
        let rows: Vec<Slot> = self.supabase.delete(TABLE, &query, self.token()).await?;
        if !rows.is_empty() {
            return Ok(());
        }

        let slot = self.get(id).await?;
        Err(SlotError::InvalidState(format!(
            "slot {} still holds {} reservation(s)",
            id, slot.current_appointment_count
        )))
    }

    async fn delete_available(&self, ids: Vec<Uuid>) -> Result<Vec<Uuid>, SlotError> {
        let mut deleted = Vec::new();

        for chunk in ids.chunks(DELETE_CHUNK) {
            let list: Vec<String> = chunk.iter().map(Uuid::to_string).collect();
            let query = format!(
                "id=in.({})&status=eq.available&current_appointment_count=eq.0",
                list.join(",")
            );
            let rows: Vec<Slot> = self.supabase.delete(TABLE, &query, self.token()).await?;
            deleted.extend(rows.into_iter().map(|slot| slot.id));
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn filter_query_renders_postgrest_operators() {
        let clinic = Uuid::nil();
        let filter = SlotFilter {
            date_from: NaiveDate::from_ymd_opt(2025, 3, 3),
            available_only: true,
            ..SlotFilter::for_owner(clinic, None)
        };

        assert_eq!(
            filter_query(&filter),
            format!(
                "clinic_id=eq.{}&slot_date=gte.2025-03-03&status=in.(available,booked)&is_clinic_level=is.true&order=slot_date.asc,start_time.asc",
                clinic
            )
        );
    }
}
