//! Deterministic stand-ins for the clock and the remote calendar provider.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::sync::clock::Clock;
use crate::sync::google_api::{
    ApiError, CalendarApi, EventPage, EventQuery, RemoteCalendar, RemoteEvent, RemoteEventPayload,
    RemoteStatus, RemoteTime,
};

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self::new(Utc.with_ymd_and_hms(year, month, day, hour, minute, second).unwrap())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List { calendar: String, page_token: Option<String> },
    Get { calendar: String, id: String },
    Create { calendar: String, payload: RemoteEventPayload },
    Update { calendar: String, id: String, payload: RemoteEventPayload },
    Delete { calendar: String, id: String },
    ListCalendars,
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::Create { .. } | Call::Update { .. } | Call::Delete { .. })
    }
}

#[derive(Default)]
struct FakeState {
    events: HashMap<String, Vec<RemoteEvent>>,
    calendars: Vec<RemoteCalendar>,
    calls: Vec<Call>,
    failures: VecDeque<ApiError>,
    page_size: Option<usize>,
    next_id: u32,
}

/// In-memory remote provider. Deletes leave a cancelled marker behind, the
/// way the real provider does when deleted events are requested.
#[derive(Default)]
pub struct FakeCalendarApi {
    state: Mutex<FakeState>,
}

impl FakeCalendarApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(self, size: usize) -> Self {
        self.state.lock().unwrap().page_size = Some(size);
        self
    }

    pub fn insert(&self, calendar: &str, event: RemoteEvent) {
        self.state
            .lock()
            .unwrap()
            .events
            .entry(calendar.to_string())
            .or_default()
            .push(event);
    }

    pub fn remove(&self, calendar: &str, id: &str) {
        if let Some(events) = self.state.lock().unwrap().events.get_mut(calendar) {
            events.retain(|e| e.id != id);
        }
    }

    pub fn add_calendar(&self, calendar: RemoteCalendar) {
        self.state.lock().unwrap().calendars.push(calendar);
    }

    /// Queues an error returned by the next call, whatever it is.
    pub fn fail_next(&self, error: ApiError) {
        self.state.lock().unwrap().failures.push_back(error);
    }

    pub fn event(&self, calendar: &str, id: &str) -> Option<RemoteEvent> {
        self.state
            .lock()
            .unwrap()
            .events
            .get(calendar)
            .and_then(|events| events.iter().find(|e| e.id == id).cloned())
    }

    /// Events that are not cancelled.
    pub fn live_events(&self, calendar: &str) -> Vec<RemoteEvent> {
        self.state
            .lock()
            .unwrap()
            .events
            .get(calendar)
            .map(|events| events.iter().filter(|e| !e.is_cancelled()).cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn approx_instant(time: &RemoteTime) -> DateTime<Utc> {
    match time {
        RemoteTime::Date(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
        RemoteTime::DateTime { civil, offset: Some(offset), .. } => {
            (*civil - chrono::Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
        }
        RemoteTime::DateTime { civil, .. } => civil.and_utc(),
    }
}

fn in_window(event: &RemoteEvent, query: &EventQuery) -> bool {
    let Some(start) = event.start.as_ref().map(approx_instant) else {
        return true;
    };
    let end = event.end.as_ref().map(approx_instant).unwrap_or(start);
    start < query.time_max && end >= query.time_min
}

fn is_series_master(event: &RemoteEvent) -> bool {
    event.recurring_event_id.is_none() && !event.recurrence.is_empty()
}

#[async_trait]
impl CalendarApi for FakeCalendarApi {
    async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> Result<EventPage, ApiError> {
        self.record(Call::List {
            calendar: calendar_id.to_string(),
            page_token: query.page_token.clone(),
        })?;

        let state = self.state.lock().unwrap();
        let matching: Vec<RemoteEvent> = state
            .events
            .get(calendar_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| query.show_deleted || !e.is_cancelled())
                    .filter(|e| !(query.expand_recurring && is_series_master(e)))
                    .filter(|e| in_window(e, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let offset: usize = query
            .page_token
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        let size = state.page_size.unwrap_or(usize::MAX);
        let events: Vec<RemoteEvent> = matching.iter().skip(offset).take(size).cloned().collect();
        let next = offset.saturating_add(size);
        let next_page_token = (next < matching.len()).then(|| next.to_string());

        Ok(EventPage {
            events,
            next_page_token,
            unreadable_ids: Vec::new(),
        })
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<RemoteEvent, ApiError> {
        self.record(Call::Get {
            calendar: calendar_id.to_string(),
            id: event_id.to_string(),
        })?;
        self.event(calendar_id, event_id)
            .ok_or_else(|| ApiError::NotFound(event_id.to_string()))
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        payload: &RemoteEventPayload,
    ) -> Result<RemoteEvent, ApiError> {
        self.record(Call::Create {
            calendar: calendar_id.to_string(),
            payload: payload.clone(),
        })?;

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let event = RemoteEvent {
            id: format!("remote-{}", state.next_id),
            recurring_event_id: None,
            summary: Some(payload.summary.clone()),
            description: Some(payload.description.clone()),
            location: payload.location.clone(),
            start: Some(payload.start.clone()),
            end: Some(payload.end.clone()),
            recurrence: payload.recurrence.clone(),
            updated: Some(Utc::now()),
            status: RemoteStatus::Confirmed,
        };
        state
            .events
            .entry(calendar_id.to_string())
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        payload: &RemoteEventPayload,
    ) -> Result<RemoteEvent, ApiError> {
        self.record(Call::Update {
            calendar: calendar_id.to_string(),
            id: event_id.to_string(),
            payload: payload.clone(),
        })?;

        let mut state = self.state.lock().unwrap();
        let event = state
            .events
            .get_mut(calendar_id)
            .and_then(|events| events.iter_mut().find(|e| e.id == event_id && !e.is_cancelled()))
            .ok_or_else(|| ApiError::NotFound(event_id.to_string()))?;

        event.summary = Some(payload.summary.clone());
        event.description = Some(payload.description.clone());
        event.location = payload.location.clone();
        event.start = Some(payload.start.clone());
        event.end = Some(payload.end.clone());
        event.recurrence = payload.recurrence.clone();
        event.updated = Some(Utc::now());
        Ok(event.clone())
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), ApiError> {
        self.record(Call::Delete {
            calendar: calendar_id.to_string(),
            id: event_id.to_string(),
        })?;

        let mut state = self.state.lock().unwrap();
        let event = state
            .events
            .get_mut(calendar_id)
            .and_then(|events| events.iter_mut().find(|e| e.id == event_id && !e.is_cancelled()))
            .ok_or_else(|| ApiError::NotFound(event_id.to_string()))?;
        event.status = RemoteStatus::Cancelled;
        Ok(())
    }

    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>, ApiError> {
        self.record(Call::ListCalendars)?;
        Ok(self.state.lock().unwrap().calendars.clone())
    }
}

/// Modification stamp for locally authored test events, before every test clock.
pub fn edited_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn civil(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    date(year, month, day).and_hms_opt(hour, minute, 0).unwrap()
}

/// A confirmed remote event with a civil start/end and no zone information.
pub fn remote_timed(id: &str, summary: &str, start: NaiveDateTime, end: NaiveDateTime) -> RemoteEvent {
    RemoteEvent {
        id: id.to_string(),
        recurring_event_id: None,
        summary: Some(summary.to_string()),
        description: None,
        location: None,
        start: Some(RemoteTime::DateTime { civil: start, offset: None, time_zone: None }),
        end: Some(RemoteTime::DateTime { civil: end, offset: None, time_zone: None }),
        recurrence: Vec::new(),
        updated: None,
        status: RemoteStatus::Confirmed,
    }
}

/// A confirmed all-day remote event; `end` is exclusive.
pub fn remote_all_day(id: &str, summary: &str, start: NaiveDate, end: NaiveDate) -> RemoteEvent {
    RemoteEvent {
        start: Some(RemoteTime::Date(start)),
        end: Some(RemoteTime::Date(end)),
        ..remote_timed(id, summary, start.and_time(chrono::NaiveTime::MIN), end.and_time(chrono::NaiveTime::MIN))
    }
}
