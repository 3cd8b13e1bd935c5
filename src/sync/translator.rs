use std::sync::OnceLock;

use chrono::{Days, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;

use crate::calendar::recurrence;
use crate::calendar::{Calendar, Event, EventTime, Recurrence};
use crate::sync::google_api::{RemoteEvent, RemoteEventPayload, RemoteTime};

const UNTITLED: &str = "Untitled Event";

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Remote event {0} has no start time")]
    MissingStart(String),
}

/// Remote content mapped onto local fields. Sync bookkeeping is left to the
/// import engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEventFields {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub recurrence: Option<Recurrence>,
}

impl LocalEventFields {
    pub fn apply_to(self, event: &mut Event) {
        event.title = self.title;
        event.description = self.description;
        event.location = self.location;
        event.start = self.start;
        event.end = self.end;
        event.recurrence = self.recurrence;
    }
}

pub struct EventTranslator {
    time_zone: Tz,
    busy_text: String,
}

impl EventTranslator {
    pub fn new(time_zone: Tz, busy_text: impl Into<String>) -> Self {
        Self {
            time_zone,
            busy_text: busy_text.into(),
        }
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn to_remote(&self, event: &Event, calendar: &Calendar) -> RemoteEventPayload {
        let (summary, description, location) = if calendar.sync_as_busy {
            (calendar.busy_label(&self.busy_text).to_string(), String::new(), None)
        } else {
            let location = event.location.trim();
            (
                event.title.clone(),
                strip_html(&event.description),
                (!location.is_empty()).then(|| location.to_string()),
            )
        };

        let (start, end) = match event.start {
            EventTime::Date(start) => {
                let last_day = event.end.map(|e| e.date()).unwrap_or(start).max(start);
                (RemoteTime::Date(start), RemoteTime::Date(next_day(last_day)))
            }
            EventTime::DateTime(start) => {
                let end = match event.end {
                    Some(EventTime::DateTime(end)) => end,
                    Some(EventTime::Date(end)) => end.and_time(start.time()),
                    None => start,
                };
                (self.zoned(start), self.zoned(end))
            }
        };

        let recurrence = event
            .recurrence
            .as_ref()
            .map(|r| vec![recurrence::encode(r, &event.start)])
            .unwrap_or_default();

        RemoteEventPayload {
            summary,
            description,
            location,
            start,
            end,
            recurrence,
        }
    }

    /// Maps a remote event onto local fields. The recurrence comes from the
    /// series master when one is given, since expanded instances carry none.
    pub fn from_remote(
        &self,
        remote: &RemoteEvent,
        master: Option<&RemoteEvent>,
    ) -> Result<LocalEventFields, TranslateError> {
        let start = remote
            .start
            .as_ref()
            .map(|t| self.local_start(t))
            .ok_or_else(|| TranslateError::MissingStart(remote.id.clone()))?;

        let end = match &remote.end {
            Some(RemoteTime::Date(end)) => {
                let inclusive = end.checked_sub_days(Days::new(1)).unwrap_or(*end);
                EventTime::Date(inclusive.max(start.date()))
            }
            Some(time) => self.local_start(time),
            None => start,
        };

        let rules = master.map(|m| &m.recurrence).unwrap_or(&remote.recurrence);

        Ok(LocalEventFields {
            title: remote
                .summary
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNTITLED)
                .to_string(),
            description: remote.description.as_deref().map(strip_html).unwrap_or_default(),
            location: remote.location.clone().unwrap_or_default(),
            start,
            end: Some(end),
            recurrence: recurrence::decode_lines(rules),
        })
    }

    fn zoned(&self, civil: NaiveDateTime) -> RemoteTime {
        RemoteTime::DateTime {
            civil,
            offset: None,
            time_zone: Some(self.time_zone.name().to_string()),
        }
    }

    fn local_start(&self, time: &RemoteTime) -> EventTime {
        match time {
            RemoteTime::Date(date) => EventTime::Date(*date),
            RemoteTime::DateTime {
                civil,
                offset,
                time_zone,
            } => EventTime::DateTime(self.local_civil(*civil, *offset, time_zone.as_deref())),
        }
    }

    /// Civil time in the configured zone for a remote civil time.
    fn local_civil(
        &self,
        civil: NaiveDateTime,
        offset: Option<chrono::FixedOffset>,
        zone_name: Option<&str>,
    ) -> NaiveDateTime {
        if let Some(offset) = offset {
            if let Some(instant) = offset.from_local_datetime(&civil).single() {
                return instant.with_timezone(&self.time_zone).naive_local();
            }
        }

        if let Some(zone) = zone_name.and_then(|name| name.parse::<Tz>().ok()) {
            if let Some(instant) = zone.from_local_datetime(&civil).earliest() {
                return instant.with_timezone(&self.time_zone).naive_local();
            }
        }

        civil
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Plain text for a possibly HTML description. Links keep their target.
pub fn strip_html(html: &str) -> String {
    if !html.contains('<') {
        return html.trim().to_string();
    }
    let normalized = expand_anchor_tags(html);
    html2text::from_read(normalized.as_bytes(), 1000).trim().to_string()
}

fn expand_anchor_tags(html: &str) -> String {
    static LINK_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(regex) = LINK_RE
        .get_or_init(|| Regex::new(r#"(?is)<a\s+[^>]*?href=["']([^"']+)["'][^>]*>(.*?)</a>"#).ok())
    else {
        return html.to_string();
    };

    regex
        .replace_all(html, |caps: &regex::Captures| {
            let url = caps.get(1).map(|m| m.as_str()).unwrap_or_default().trim();
            let text = caps.get(2).map(|m| m.as_str()).unwrap_or_default().trim();

            if text.is_empty() || url.eq_ignore_ascii_case(text) {
                url.to_string()
            } else {
                format!("{text} ({url})")
            }
        })
        .into_owned()
}
