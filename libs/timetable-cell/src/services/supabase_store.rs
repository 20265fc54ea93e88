use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, PREFER_REPRESENTATION};

use crate::error::TimetableError;
use crate::models::{sort_entries, DayOfWeek, TimetableEntry, TimetableOwner};
use crate::services::store::TimetableRepository;

const TABLE: &str = "timetables";

/// Timetable rows in the `timetables` PostgREST table.
pub struct SupabaseTimetableRepository {
    supabase: SupabaseClient,
    service_key: String,
}

impl SupabaseTimetableRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            service_key: config.supabase_service_role_key.clone(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(self.service_key.as_str()).filter(|key| !key.is_empty())
    }

    fn owner_filter(owner: TimetableOwner) -> String {
        format!("owner_kind=eq.{}&owner_id=eq.{}", owner.kind, owner.id)
    }
}

#[async_trait]
impl TimetableRepository for SupabaseTimetableRepository {
    async fn insert(&self, entry: TimetableEntry) -> Result<TimetableEntry, TimetableError> {
        let rows: Vec<TimetableEntry> = self.supabase
            .insert(TABLE, "", json!(entry), PREFER_REPRESENTATION, self.token())
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| TimetableError::Storage("Failed to create timetable entry".to_string()))
    }

    async fn get(&self, owner: TimetableOwner, id: Uuid) -> Result<TimetableEntry, TimetableError> {
        let query = format!("id=eq.{}&{}", id, Self::owner_filter(owner));
        let rows: Vec<TimetableEntry> = self.supabase.select(TABLE, &query, self.token()).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| TimetableError::NotFound(id.to_string()))
    }

    async fn list(&self, owner: TimetableOwner) -> Result<Vec<TimetableEntry>, TimetableError> {
        let query = format!("{}&order=slot_order.asc,start_time.asc", Self::owner_filter(owner));
        let mut rows: Vec<TimetableEntry> = self.supabase.select(TABLE, &query, self.token()).await?;
        debug!("Loaded {} timetable entries for {}", rows.len(), owner);

        // day_of_week is stored as text, so order it here
        sort_entries(&mut rows);
        Ok(rows)
    }

    async fn update(&self, entry: TimetableEntry) -> Result<TimetableEntry, TimetableError> {
        let query = format!("id=eq.{}&{}", entry.id, Self::owner_filter(entry.owner()));
        let patch = json!({
            "day_of_week": entry.day_of_week,
            "start_time": entry.start_time,
            "end_time": entry.end_time,
            "is_active": entry.is_active,
            "slot_order": entry.slot_order,
            "notes": entry.notes,
            "updated_at": entry.updated_at,
        });

        let rows: Vec<TimetableEntry> = self.supabase.update(TABLE, &query, patch, self.token()).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| TimetableError::NotFound(entry.id.to_string()))
    }

    async fn delete(&self, owner: TimetableOwner, id: Uuid) -> Result<(), TimetableError> {
        let query = format!("id=eq.{}&{}", id, Self::owner_filter(owner));
        let rows: Vec<TimetableEntry> = self.supabase.delete(TABLE, &query, self.token()).await?;

        if rows.is_empty() {
            return Err(TimetableError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn replace_day(
        &self,
        owner: TimetableOwner,
        day: DayOfWeek,
        entries: Vec<TimetableEntry>,
    ) -> Result<Vec<TimetableEntry>, TimetableError> {
        let query = format!("{}&day_of_week=eq.{}", Self::owner_filter(owner), day);
        let removed: Vec<TimetableEntry> = self.supabase.delete(TABLE, &query, self.token()).await?;
        debug!("Replacing {} {} entries for {}", removed.len(), day, owner);

        if entries.is_empty() {
            return Ok(entries);
        }

        let mut rows: Vec<TimetableEntry> = self.supabase
            .insert(TABLE, "", json!(entries), PREFER_REPRESENTATION, self.token())
            .await?;
        sort_entries(&mut rows);
        Ok(rows)
    }
}
