use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::TimetableError;
use crate::models::{
    CreateTimetableEntryRequest, DayOfWeek, InitializeDay, TimeOfDay, TimetableEntry,
    TimetableOwner, TimetableQuery, UpdateTimetableEntryRequest,
};
use crate::services::store::TimetableRepository;

pub struct TimetableService {
    repository: Arc<dyn TimetableRepository>,
}

impl TimetableService {
    pub fn new(repository: Arc<dyn TimetableRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> Arc<dyn TimetableRepository> {
        Arc::clone(&self.repository)
    }

    /// Create a single timetable window for a clinic or doctor
    pub async fn create_entry(
        &self,
        owner: TimetableOwner,
        request: CreateTimetableEntryRequest,
    ) -> Result<TimetableEntry, TimetableError> {
        debug!("Creating {} timetable entry for {}", request.day_of_week, owner);

        validate_window(request.start_time, request.end_time)?;
        let is_active = request.is_active.unwrap_or(true);

        let existing = self.repository.list(owner).await?;
        if is_active {
            check_overlap(&existing, request.day_of_week, request.start_time, request.end_time, None)?;
        }

        let slot_order = match request.slot_order {
            Some(order) => validate_slot_order(order)?,
            None => next_slot_order(&existing, request.day_of_week),
        };

        let now = Utc::now();
        let entry = TimetableEntry {
            id: Uuid::new_v4(),
            owner_kind: owner.kind,
            owner_id: owner.id,
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            is_active,
            slot_order,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        let created = self.repository.insert(entry).await?;
        info!("Timetable entry {} created for {}", created.id, owner);
        Ok(created)
    }

    pub async fn get_entry(&self, owner: TimetableOwner, id: Uuid) -> Result<TimetableEntry, TimetableError> {
        self.repository.get(owner, id).await
    }

    pub async fn list_entries(
        &self,
        owner: TimetableOwner,
        query: &TimetableQuery,
    ) -> Result<Vec<TimetableEntry>, TimetableError> {
        let mut entries = self.repository.list(owner).await?;

        if let Some(day) = query.day_of_week {
            entries.retain(|entry| entry.day_of_week == day);
        }
        if query.active_only.unwrap_or(false) {
            entries.retain(|entry| entry.is_active);
        }

        Ok(entries)
    }

    /// Active entries only, in generation order.
    pub async fn active_entries(&self, owner: TimetableOwner) -> Result<Vec<TimetableEntry>, TimetableError> {
        self.list_entries(owner, &TimetableQuery { day_of_week: None, active_only: Some(true) }).await
    }

    pub async fn update_entry(
        &self,
        owner: TimetableOwner,
        id: Uuid,
        request: UpdateTimetableEntryRequest,
    ) -> Result<TimetableEntry, TimetableError> {
        debug!("Updating timetable entry {} for {}", id, owner);

        let mut entry = self.repository.get(owner, id).await?;

        if let Some(day) = request.day_of_week {
            entry.day_of_week = day;
        }
        if let Some(start) = request.start_time {
            entry.start_time = start;
        }
        if let Some(end) = request.end_time {
            entry.end_time = end;
        }
        if let Some(active) = request.is_active {
            entry.is_active = active;
        }
        if let Some(order) = request.slot_order {
            entry.slot_order = validate_slot_order(order)?;
        }
        if request.notes.is_some() {
            entry.notes = request.notes;
        }

        validate_window(entry.start_time, entry.end_time)?;

        if entry.is_active {
            let existing = self.repository.list(owner).await?;
            check_overlap(&existing, entry.day_of_week, entry.start_time, entry.end_time, Some(entry.id))?;
        }

        entry.updated_at = Utc::now();
        self.repository.update(entry).await
    }

    pub async fn delete_entry(&self, owner: TimetableOwner, id: Uuid) -> Result<(), TimetableError> {
        self.repository.delete(owner, id).await?;
        info!("Timetable entry {} deleted for {}", id, owner);
        Ok(())
    }

    /// Bulk weekly setup. Each listed day is replaced by the given windows,
    /// numbered in start-time order. Days not listed are left alone. All input
    /// is validated before anything is written.
    pub async fn initialize(
        &self,
        owner: TimetableOwner,
        days: Vec<InitializeDay>,
    ) -> Result<Vec<TimetableEntry>, TimetableError> {
        let mut seen = HashSet::new();
        for day in &days {
            if !seen.insert(day.day_of_week) {
                return Err(TimetableError::Validation(format!(
                    "{} is listed more than once",
                    day.day_of_week
                )));
            }

            let mut windows: Vec<(TimeOfDay, TimeOfDay)> = day
                .time_slots
                .iter()
                .map(|slot| (slot.start_time, slot.end_time))
                .collect();
            windows.sort();

            for (start, end) in &windows {
                validate_window(*start, *end)?;
            }
            for pair in windows.windows(2) {
                if pair[1].0 < pair[0].1 {
                    return Err(TimetableError::Validation(format!(
                        "{} windows {}-{} and {}-{} overlap",
                        day.day_of_week, pair[0].0, pair[0].1, pair[1].0, pair[1].1
                    )));
                }
            }
        }

        let now = Utc::now();
        let mut stored = Vec::new();

        for day in days {
            let mut slots = day.time_slots;
            slots.sort_by_key(|slot| slot.start_time);

            let entries: Vec<TimetableEntry> = slots
                .into_iter()
                .enumerate()
                .map(|(index, slot)| TimetableEntry {
                    id: Uuid::new_v4(),
                    owner_kind: owner.kind,
                    owner_id: owner.id,
                    day_of_week: day.day_of_week,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    is_active: true,
                    slot_order: index as u32 + 1,
                    notes: slot.notes,
                    created_at: now,
                    updated_at: now,
                })
                .collect();

            stored.extend(self.repository.replace_day(owner, day.day_of_week, entries).await?);
        }

        info!("Initialized {} timetable entries for {}", stored.len(), owner);
        Ok(stored)
    }
}

fn validate_window(start: TimeOfDay, end: TimeOfDay) -> Result<(), TimetableError> {
    if end.total_minutes() <= start.total_minutes() {
        return Err(TimetableError::Validation(format!(
            "end time {} must be after start time {}",
            end, start
        )));
    }
    Ok(())
}

fn validate_slot_order(order: u32) -> Result<u32, TimetableError> {
    if order < 1 {
        return Err(TimetableError::Validation("slot_order must be at least 1".to_string()));
    }
    Ok(order)
}

fn next_slot_order(existing: &[TimetableEntry], day: DayOfWeek) -> u32 {
    existing
        .iter()
        .filter(|entry| entry.day_of_week == day)
        .map(|entry| entry.slot_order)
        .max()
        .unwrap_or(0)
        + 1
}

fn check_overlap(
    existing: &[TimetableEntry],
    day: DayOfWeek,
    start: TimeOfDay,
    end: TimeOfDay,
    exclude_id: Option<Uuid>,
) -> Result<(), TimetableError> {
    let clash = existing.iter().find(|entry| {
        entry.is_active
            && entry.day_of_week == day
            && Some(entry.id) != exclude_id
            && entry.overlaps(start, end)
    });

    match clash {
        Some(entry) => Err(TimetableError::Conflict(format!(
            "window {}-{} overlaps existing {} entry {}-{}",
            start, end, day, entry.start_time, entry.end_time
        ))),
        None => Ok(()),
    }
}
