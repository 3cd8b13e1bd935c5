use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }

    /// Errors worth another attempt after a backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::ServerError { .. } => true,
            _ => false,
        }
    }
}

/// A remote start or end: a civil date for all-day events, otherwise a civil
/// time with an optional UTC offset and IANA zone name.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteTime {
    Date(NaiveDate),
    DateTime {
        civil: NaiveDateTime,
        offset: Option<FixedOffset>,
        time_zone: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEvent {
    pub id: String,
    /// Series master id when this is an expanded instance.
    pub recurring_event_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Cancelled instances may arrive without times.
    pub start: Option<RemoteTime>,
    pub end: Option<RemoteTime>,
    pub recurrence: Vec<String>,
    pub updated: Option<DateTime<Utc>>,
    pub status: RemoteStatus,
}

impl RemoteEvent {
    /// Id of the series this event belongs to (its own id when standalone).
    pub fn series_id(&self) -> &str {
        self.recurring_event_id.as_deref().unwrap_or(&self.id)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RemoteStatus::Cancelled
    }
}

/// Body of a create or update call.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEventPayload {
    pub summary: String,
    pub description: String,
    pub location: Option<String>,
    pub start: RemoteTime,
    pub end: RemoteTime,
    pub recurrence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCalendar {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub show_deleted: bool,
    pub expand_recurring: bool,
    pub max_results: u32,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventPage {
    pub events: Vec<RemoteEvent>,
    pub next_page_token: Option<String>,
    /// Ids (and series ids) of listed items that could not be converted.
    /// They still exist remotely even though they are missing from `events`.
    pub unreadable_ids: Vec<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> Result<EventPage, ApiError>;

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<RemoteEvent, ApiError>;

    async fn create_event(
        &self,
        calendar_id: &str,
        payload: &RemoteEventPayload,
    ) -> Result<RemoteEvent, ApiError>;

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        payload: &RemoteEventPayload,
    ) -> Result<RemoteEvent, ApiError>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), ApiError>;

    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>, ApiError>;
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GoogleEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "recurringEventId", skip_serializing_if = "Option::is_none")]
    recurring_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<GoogleDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<GoogleDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    recurrence: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GoogleDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventListResponse {
    items: Option<Vec<GoogleEvent>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    items: Option<Vec<GoogleCalendarEntry>>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarEntry {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    primary: Option<bool>,
}

fn time_from_google(gt: GoogleDateTime) -> Result<RemoteTime, ApiError> {
    if let Some(value) = gt.date_time {
        if let Ok(at) = DateTime::parse_from_rfc3339(&value) {
            return Ok(RemoteTime::DateTime {
                civil: at.naive_local(),
                offset: Some(*at.offset()),
                time_zone: gt.time_zone,
            });
        }
        let civil = NaiveDateTime::parse_from_str(&value, "%Y-%m-%dT%H:%M:%S")
            .map_err(|e| ApiError::ParseError(format!("Invalid dateTime {}: {}", value, e)))?;
        return Ok(RemoteTime::DateTime {
            civil,
            offset: None,
            time_zone: gt.time_zone,
        });
    }

    if let Some(value) = gt.date {
        let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map_err(|e| ApiError::ParseError(format!("Invalid date {}: {}", value, e)))?;
        return Ok(RemoteTime::Date(date));
    }

    Err(ApiError::ParseError("Time has neither date nor dateTime".to_string()))
}

fn time_to_google(time: &RemoteTime) -> GoogleDateTime {
    match time {
        RemoteTime::Date(date) => GoogleDateTime {
            date: Some(date.format("%Y-%m-%d").to_string()),
            ..Default::default()
        },
        RemoteTime::DateTime { civil, offset, time_zone } => {
            let date_time = match offset {
                Some(offset) => format!("{}{}", civil.format("%Y-%m-%dT%H:%M:%S"), offset),
                None => civil.format("%Y-%m-%dT%H:%M:%S").to_string(),
            };
            GoogleDateTime {
                date_time: Some(date_time),
                date: None,
                time_zone: time_zone.clone(),
            }
        }
    }
}

fn convert_from_google_event(ge: GoogleEvent) -> Result<RemoteEvent, ApiError> {
    let id = ge.id.ok_or_else(|| ApiError::ParseError("Missing event id".to_string()))?;

    let status = match ge.status.as_deref() {
        Some("tentative") => RemoteStatus::Tentative,
        Some("cancelled") => RemoteStatus::Cancelled,
        _ => RemoteStatus::Confirmed,
    };

    let updated = ge
        .updated
        .as_deref()
        .and_then(|u| DateTime::parse_from_rfc3339(u).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(RemoteEvent {
        id,
        recurring_event_id: ge.recurring_event_id,
        summary: ge.summary,
        description: ge.description,
        location: ge.location,
        start: ge.start.map(time_from_google).transpose()?,
        end: ge.end.map(time_from_google).transpose()?,
        recurrence: ge.recurrence,
        updated,
        status,
    })
}

fn convert_to_google_event(payload: &RemoteEventPayload) -> GoogleEvent {
    GoogleEvent {
        summary: Some(payload.summary.clone()),
        description: Some(payload.description.clone()),
        location: payload.location.clone(),
        start: Some(time_to_google(&payload.start)),
        end: Some(time_to_google(&payload.end)),
        recurrence: payload.recurrence.clone(),
        ..Default::default()
    }
}

fn is_rate_limit_body(body: &str) -> bool {
    body.contains("rateLimitExceeded") || body.contains("userRateLimitExceeded")
}

pub struct GoogleCalendarClient {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl GoogleCalendarClient {
    pub fn new(access_token: String) -> Self {
        Self {
            base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            access_token,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.base_url, urlencoding::encode(calendar_id))
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!("{}/{}", self.events_url(calendar_id), urlencoding::encode(event_id))
    }

    /// Maps a non-success response onto the error taxonomy.
    async fn check(&self, response: reqwest::Response, target: &str) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let code = status.as_u16();

        match code {
            401 => {
                tracing::error!("Authentication failed for {}", target);
                Err(ApiError::AuthenticationFailed)
            }
            404 | 410 => Err(ApiError::NotFound(target.to_string())),
            429 => {
                tracing::warn!("Rate limit exceeded for {}", target);
                Err(ApiError::RateLimited)
            }
            403 if is_rate_limit_body(&body) => {
                tracing::warn!("Rate limit exceeded for {}", target);
                Err(ApiError::RateLimited)
            }
            500..=599 => {
                tracing::error!("Server error for {}. Status: {}, Body: {}", target, status, body);
                Err(ApiError::ServerError { status: code, body })
            }
            _ => {
                tracing::error!("Request for {} rejected. Status: {}, Body: {}", target, status, body);
                Err(ApiError::Rejected { status: code, body })
            }
        }
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> Result<EventPage, ApiError> {
        let time_min = query.time_min.to_rfc3339();
        let time_max = query.time_max.to_rfc3339();
        let max_results = query.max_results.to_string();

        let mut params = vec![
            ("timeMin", time_min.as_str()),
            ("timeMax", time_max.as_str()),
            ("showDeleted", if query.show_deleted { "true" } else { "false" }),
            ("singleEvents", if query.expand_recurring { "true" } else { "false" }),
            ("maxResults", max_results.as_str()),
        ];
        if query.expand_recurring {
            params.push(("orderBy", "startTime"));
        }
        if let Some(token) = query.page_token.as_deref() {
            params.push(("pageToken", token));
        }

        tracing::info!("Fetching events of {} from {} to {}", calendar_id, time_min, time_max);

        let response = self
            .client
            .get(self.events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await?;

        let response = self.check(response, calendar_id).await?;
        let list: EventListResponse = response.json().await?;

        let mut events = Vec::new();
        let mut unreadable_ids = Vec::new();
        for item in list.items.unwrap_or_default() {
            let ids: Vec<String> = item.id.iter().chain(item.recurring_event_id.iter()).cloned().collect();
            match convert_from_google_event(item) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Skipping unreadable remote event {:?}: {}", ids.first(), e);
                    unreadable_ids.extend(ids);
                }
            }
        }

        tracing::info!("Fetched {} events from {}", events.len(), calendar_id);
        Ok(EventPage {
            events,
            next_page_token: list.next_page_token,
            unreadable_ids,
        })
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<RemoteEvent, ApiError> {
        let response = self
            .client
            .get(self.event_url(calendar_id, event_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let response = self.check(response, event_id).await?;
        convert_from_google_event(response.json().await?)
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        payload: &RemoteEventPayload,
    ) -> Result<RemoteEvent, ApiError> {
        let url = self.events_url(calendar_id);
        let google_event = convert_to_google_event(payload);

        tracing::debug!("POST {} with payload: {:?}", url, google_event);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&google_event)
            .send()
            .await?;

        let response = self.check(response, calendar_id).await?;
        let created = convert_from_google_event(response.json().await?)?;
        tracing::info!("Created remote event {} in {}", created.id, calendar_id);
        Ok(created)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        payload: &RemoteEventPayload,
    ) -> Result<RemoteEvent, ApiError> {
        let url = self.event_url(calendar_id, event_id);
        let google_event = convert_to_google_event(payload);

        tracing::debug!("PUT {} with payload: {:?}", url, google_event);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(&google_event)
            .send()
            .await?;

        let response = self.check(response, event_id).await?;
        let updated = convert_from_google_event(response.json().await?)?;
        tracing::info!("Updated remote event {} in {}", event_id, calendar_id);
        Ok(updated)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.event_url(calendar_id, event_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        self.check(response, event_id).await?;
        tracing::info!("Deleted remote event {} from {}", event_id, calendar_id);
        Ok(())
    }

    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>, ApiError> {
        let response = self
            .client
            .get(format!("{}/users/me/calendarList", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let response = self.check(response, "calendarList").await?;
        let list: CalendarListResponse = response.json().await?;

        Ok(list
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|entry| RemoteCalendar {
                summary: entry.summary.unwrap_or_else(|| entry.id.clone()),
                id: entry.id,
                description: entry.description,
                primary: entry.primary.unwrap_or(false),
            })
            .collect())
    }
}
