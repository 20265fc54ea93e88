// libs/timetable-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// TIME OF DAY
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time of day '{0}', expected HH:MM between 00:00 and 23:59")]
pub struct InvalidTimeOfDay(pub String);

/// Clinic-local wall-clock time with minute resolution. Only the minute offset
/// from midnight is stored; hours and minutes are derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    total_minutes: u16,
}

impl TimeOfDay {
    pub const MINUTES_PER_DAY: u32 = 24 * 60;

    pub fn new(hours: u32, minutes: u32) -> Result<Self, InvalidTimeOfDay> {
        if hours > 23 || minutes > 59 {
            return Err(InvalidTimeOfDay(format!("{}:{}", hours, minutes)));
        }
        Ok(Self { total_minutes: (hours * 60 + minutes) as u16 })
    }

    pub fn from_total_minutes(total_minutes: u32) -> Option<Self> {
        (total_minutes < Self::MINUTES_PER_DAY).then(|| Self { total_minutes: total_minutes as u16 })
    }

    pub fn hours(&self) -> u32 {
        u32::from(self.total_minutes) / 60
    }

    pub fn minutes(&self) -> u32 {
        u32::from(self.total_minutes) % 60
    }

    pub fn total_minutes(&self) -> u32 {
        u32::from(self.total_minutes)
    }

    /// 12-hour clock rendering, e.g. `08:15 AM`, `12:00 PM`.
    pub fn to_12h(&self) -> String {
        let hours = self.hours();
        let suffix = if hours < 12 { "AM" } else { "PM" };
        let display_hours = match hours % 12 {
            0 => 12,
            h => h,
        };
        format!("{:02}:{:02} {}", display_hours, self.minutes(), suffix)
    }

    pub fn view(&self) -> TimeOfDayView {
        TimeOfDayView {
            hours: self.hours(),
            minutes: self.minutes(),
            time: self.to_string(),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours(), self.minutes())
    }
}

impl FromStr for TimeOfDay {
    type Err = InvalidTimeOfDay;

    /// Accepts `HH:MM` and `HH:MM:SS`; seconds must be zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTimeOfDay(s.to_string());
        let parts: Vec<&str> = s.trim().split(':').collect();

        let (hours, minutes, seconds) = match parts.as_slice() {
            [h, m] => (*h, *m, "0"),
            [h, m, sec] => (*h, *m, *sec),
            _ => return Err(invalid()),
        };

        let hours: u32 = hours.parse().map_err(|_| invalid())?;
        let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
        let seconds: u32 = seconds.parse().map_err(|_| invalid())?;

        if seconds != 0 {
            return Err(invalid());
        }

        Self::new(hours, minutes).map_err(|_| invalid())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeOfDayRepr {
    Text(String),
    Parts { hours: u32, minutes: u32 },
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match TimeOfDayRepr::deserialize(deserializer)? {
            TimeOfDayRepr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            TimeOfDayRepr::Parts { hours, minutes } => {
                TimeOfDay::new(hours, minutes).map_err(serde::de::Error::custom)
            }
        }
    }
}

/// API rendering of a [`TimeOfDay`]: `{hours, minutes, time}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeOfDayView {
    pub hours: u32,
    pub minutes: u32,
    pub time: String,
}

// ==============================================================================
// DAY OF WEEK
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
        DayOfWeek::Sat,
        DayOfWeek::Sun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "mon",
            DayOfWeek::Tue => "tue",
            DayOfWeek::Wed => "wed",
            DayOfWeek::Thu => "thu",
            DayOfWeek::Fri => "fri",
            DayOfWeek::Sat => "sat",
            DayOfWeek::Sun => "sun",
        }
    }

    /// Legacy numeric encoding, 0 = Sunday through 6 = Saturday.
    pub fn from_number(day: i64) -> Option<Self> {
        match day {
            0 => Some(DayOfWeek::Sun),
            1 => Some(DayOfWeek::Mon),
            2 => Some(DayOfWeek::Tue),
            3 => Some(DayOfWeek::Wed),
            4 => Some(DayOfWeek::Thu),
            5 => Some(DayOfWeek::Fri),
            6 => Some(DayOfWeek::Sat),
            _ => None,
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
            Weekday::Sun => DayOfWeek::Sun,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let day = match lower.as_str() {
            "mon" | "monday" => DayOfWeek::Mon,
            "tue" | "tues" | "tuesday" => DayOfWeek::Tue,
            "wed" | "wednesday" => DayOfWeek::Wed,
            "thu" | "thurs" | "thursday" => DayOfWeek::Thu,
            "fri" | "friday" => DayOfWeek::Fri,
            "sat" | "saturday" => DayOfWeek::Sat,
            "sun" | "sunday" => DayOfWeek::Sun,
            _ => return Err(format!("invalid day of week '{}'", s)),
        };
        Ok(day)
    }
}

impl Serialize for DayOfWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DayOfWeekRepr {
    Name(String),
    Number(i64),
}

impl<'de> Deserialize<'de> for DayOfWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match DayOfWeekRepr::deserialize(deserializer)? {
            DayOfWeekRepr::Name(name) => name.parse().map_err(serde::de::Error::custom),
            DayOfWeekRepr::Number(n) => DayOfWeek::from_number(n)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid day of week {}", n))),
        }
    }
}

// ==============================================================================
// TIMETABLE ENTRIES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Clinic,
    Doctor,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerKind::Clinic => write!(f, "clinic"),
            OwnerKind::Doctor => write!(f, "doctor"),
        }
    }
}

/// Whose weekly schedule a timetable entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimetableOwner {
    pub kind: OwnerKind,
    pub id: Uuid,
}

impl TimetableOwner {
    pub fn clinic(id: Uuid) -> Self {
        Self { kind: OwnerKind::Clinic, id }
    }

    pub fn doctor(id: Uuid) -> Self {
        Self { kind: OwnerKind::Doctor, id }
    }
}

impl fmt::Display for TimetableOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: Uuid,
    pub owner_kind: OwnerKind,
    pub owner_id: Uuid,
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub is_active: bool,
    pub slot_order: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimetableEntry {
    pub fn owner(&self) -> TimetableOwner {
        TimetableOwner { kind: self.owner_kind, id: self.owner_id }
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end_time.total_minutes().saturating_sub(self.start_time.total_minutes())
    }

    /// True when `[start, end)` lies entirely inside this entry's window.
    pub fn covers(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.start_time <= start && end <= self.end_time
    }

    pub fn overlaps(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// Orders entries by day, then `slot_order`, then start time.
pub fn sort_entries(entries: &mut [TimetableEntry]) {
    entries.sort_by(|a, b| {
        a.day_of_week
            .cmp(&b.day_of_week)
            .then(a.slot_order.cmp(&b.slot_order))
            .then(a.start_time.cmp(&b.start_time))
    });
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTimetableEntryRequest {
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub is_active: Option<bool>,
    pub slot_order: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTimetableEntryRequest {
    pub day_of_week: Option<DayOfWeek>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
    pub is_active: Option<bool>,
    pub slot_order: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeTimeSlot {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub notes: Option<String>,
}

/// One day of a bulk `initialize` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeDay {
    pub day_of_week: DayOfWeek,
    pub time_slots: Vec<InitializeTimeSlot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimetableQuery {
    pub day_of_week: Option<DayOfWeek>,
    pub active_only: Option<bool>,
}
