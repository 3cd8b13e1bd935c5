use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUSY_TEXT: &str = "Busy";

/// The sync-relevant slice of a local calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: i64,
    pub title: String,
    pub sync_enabled: bool,
    pub import_calendar: Option<String>,
    pub export_calendar: Option<String>,
    pub sync_as_busy: bool,
    pub busy_text: Option<String>,
    pub sync_horizon: Option<DateTime<Utc>>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl Calendar {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            sync_enabled: false,
            import_calendar: None,
            export_calendar: None,
            sync_as_busy: false,
            busy_text: None,
            sync_horizon: None,
            last_sync: None,
        }
    }

    /// Explicit horizon, or `now + default_span` when none is stored.
    pub fn horizon(&self, now: DateTime<Utc>, default_span: Duration) -> DateTime<Utc> {
        self.sync_horizon.unwrap_or(now + default_span)
    }

    pub fn busy_label<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.busy_text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ if !fallback.is_empty() => fallback,
            _ => DEFAULT_BUSY_TEXT,
        }
    }
}
