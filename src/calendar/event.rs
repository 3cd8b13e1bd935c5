use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::Recurrence;

/// Start or end of a local event: a calendar day, or a wall-clock time in the
/// configured local zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl EventTime {
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::Date(date) => *date,
            EventTime::DateTime(dt) => dt.date(),
        }
    }

    pub fn to_utc(&self, zone: Tz) -> DateTime<Utc> {
        let civil = match self {
            EventTime::Date(date) => date.and_time(chrono::NaiveTime::MIN),
            EventTime::DateTime(dt) => *dt,
        };
        zone.from_local_datetime(&civil)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| civil.and_utc())
    }
}

/// Who wrote the event last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Origin {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub calendar_id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub published: bool,
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub recurrence: Option<Recurrence>,
    /// Remote id this event was imported from.
    pub remote_import_id: Option<String>,
    /// Remote id this event was pushed to. Never shares a namespace with
    /// `remote_import_id`.
    pub remote_export_id: Option<String>,
    pub origin: Origin,
    pub remote_source_calendar: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub modified_at: DateTime<Utc>,
}

impl Event {
    pub fn new(calendar_id: i64, title: impl Into<String>, start: EventTime, modified_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            calendar_id,
            title: title.into(),
            description: String::new(),
            location: String::new(),
            published: true,
            start,
            end: None,
            recurrence: None,
            remote_import_id: None,
            remote_export_id: None,
            origin: Origin::Local,
            remote_source_calendar: None,
            last_synced_at: None,
            modified_at,
        }
    }

    pub fn recurrence_ended(&self, now: DateTime<Utc>) -> bool {
        self.recurrence.is_some_and(|r| r.has_ended(now))
    }

    /// Whether an export would only repeat the last successful write.
    pub fn unchanged_since_sync(&self) -> bool {
        self.remote_export_id.is_some()
            && self.last_synced_at.is_some_and(|synced| self.modified_at <= synced)
    }

    /// Forgets every remote link, as needed for a duplicated event.
    pub fn reset_sync_state(&mut self) {
        self.remote_import_id = None;
        self.remote_export_id = None;
        self.remote_source_calendar = None;
        self.last_synced_at = None;
        self.origin = Origin::Local;
    }
}
