use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::TimetableError;
use crate::models::{sort_entries, DayOfWeek, TimetableEntry, TimetableOwner};

/// Persistence seam for timetable entries. Timetables are read-mostly; edits
/// come from clinic staff through [`crate::TimetableService`].
#[async_trait]
pub trait TimetableRepository: Send + Sync {
    async fn insert(&self, entry: TimetableEntry) -> Result<TimetableEntry, TimetableError>;

    async fn get(&self, owner: TimetableOwner, id: Uuid) -> Result<TimetableEntry, TimetableError>;

    /// All entries of an owner, ordered by day, `slot_order`, start time.
    async fn list(&self, owner: TimetableOwner) -> Result<Vec<TimetableEntry>, TimetableError>;

    async fn update(&self, entry: TimetableEntry) -> Result<TimetableEntry, TimetableError>;

    async fn delete(&self, owner: TimetableOwner, id: Uuid) -> Result<(), TimetableError>;

    /// Drops every entry of `owner` on `day` and stores `entries` instead.
    async fn replace_day(
        &self,
        owner: TimetableOwner,
        day: DayOfWeek,
        entries: Vec<TimetableEntry>,
    ) -> Result<Vec<TimetableEntry>, TimetableError>;
}

#[derive(Default)]
pub struct InMemoryTimetableRepository {
    entries: RwLock<HashMap<Uuid, TimetableEntry>>,
}

impl InMemoryTimetableRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TimetableRepository for InMemoryTimetableRepository {
    async fn insert(&self, entry: TimetableEntry) -> Result<TimetableEntry, TimetableError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.id) {
            return Err(TimetableError::Conflict(format!("entry {} already exists", entry.id)));
        }
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get(&self, owner: TimetableOwner, id: Uuid) -> Result<TimetableEntry, TimetableError> {
        self.entries
            .read()
            .await
            .get(&id)
            .filter(|entry| entry.owner() == owner)
            .cloned()
            .ok_or_else(|| TimetableError::NotFound(id.to_string()))
    }

    async fn list(&self, owner: TimetableOwner) -> Result<Vec<TimetableEntry>, TimetableError> {
        let mut found: Vec<TimetableEntry> = self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.owner() == owner)
            .cloned()
            .collect();
        sort_entries(&mut found);
        Ok(found)
    }

    async fn update(&self, entry: TimetableEntry) -> Result<TimetableEntry, TimetableError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&entry.id) {
            Some(existing) if existing.owner() == entry.owner() => {
                *existing = entry.clone();
                Ok(entry)
            }
            _ => Err(TimetableError::NotFound(entry.id.to_string())),
        }
    }

    async fn delete(&self, owner: TimetableOwner, id: Uuid) -> Result<(), TimetableError> {
        let mut entries = self.entries.write().await;
        match entries.get(&id) {
            Some(entry) if entry.owner() == owner => {
                entries.remove(&id);
                Ok(())
            }
            _ => Err(TimetableError::NotFound(id.to_string())),
        }
    }

    async fn replace_day(
        &self,
        owner: TimetableOwner,
        day: DayOfWeek,
        new_entries: Vec<TimetableEntry>,
    ) -> Result<Vec<TimetableEntry>, TimetableError> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !(entry.owner() == owner && entry.day_of_week == day));
        for entry in &new_entries {
            entries.insert(entry.id, entry.clone());
        }

        let mut stored = new_entries;
        sort_entries(&mut stored);
        Ok(stored)
    }
}
