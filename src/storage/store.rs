use thiserror::Error;

use crate::calendar::{Calendar, Event};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Local persistence for calendars and events.
///
/// Implementations serialize writes themselves; the sync engines perform one
/// read-modify-write per entity.
pub trait CalendarStore {
    fn calendars(&self) -> Result<Vec<Calendar>, StoreError>;

    fn sync_enabled_calendars(&self) -> Result<Vec<Calendar>, StoreError> {
        Ok(self
            .calendars()?
            .into_iter()
            .filter(|c| c.sync_enabled)
            .collect())
    }

    fn calendar(&self, id: i64) -> Result<Option<Calendar>, StoreError>;

    /// Persists a new calendar and returns it with its assigned id.
    fn insert_calendar(&self, calendar: Calendar) -> Result<Calendar, StoreError>;

    fn save_calendar(&self, calendar: &Calendar) -> Result<(), StoreError>;

    fn event(&self, id: i64) -> Result<Option<Event>, StoreError>;

    fn events_for_calendar(&self, calendar_id: i64) -> Result<Vec<Event>, StoreError>;

    /// Persists a new event and returns it with its assigned id.
    fn insert_event(&self, event: Event) -> Result<Event, StoreError>;

    fn save_event(&self, event: &Event) -> Result<(), StoreError>;

    fn delete_event(&self, id: i64) -> Result<(), StoreError>;

    fn find_by_import_id(&self, calendar_id: i64, remote_id: &str) -> Result<Option<Event>, StoreError>;

    /// Searches every calendar: an export id identifies a local event globally.
    fn find_by_export_id(&self, remote_id: &str) -> Result<Option<Event>, StoreError>;
}
