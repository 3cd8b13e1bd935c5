//! Loop prevention: who wrote an event last and where it came from.

use chrono::{DateTime, Utc};

use crate::calendar::{Event, Origin};
use crate::storage::{CalendarStore, StoreError};
use crate::sync::google_api::RemoteEvent;

/// Pushing this event to `target` would send it back where it was imported from.
pub fn is_export_loop(event: &Event, target: &str) -> bool {
    event.origin == Origin::Remote && event.remote_source_calendar.as_deref() == Some(target)
}

/// A user edit makes the local copy authoritative again.
pub fn record_local_edit(event: &mut Event, now: DateTime<Utc>) {
    if event.origin == Origin::Remote {
        tracing::debug!("Event {} edited locally, origin is now local", event.id);
    }
    event.origin = Origin::Local;
    event.modified_at = now;
}

/// Finds the local event a remote event was exported from, if any. Such a
/// remote event is an echo of our own write and must not be imported.
pub fn exported_counterpart(
    store: &dyn CalendarStore,
    remote: &RemoteEvent,
) -> Result<Option<Event>, StoreError> {
    if let Some(event) = store.find_by_export_id(&remote.id)? {
        return Ok(Some(event));
    }
    match remote.recurring_event_id.as_deref() {
        Some(series) => store.find_by_export_id(series),
        None => Ok(None),
    }
}
