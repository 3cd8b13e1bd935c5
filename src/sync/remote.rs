use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::sync::clock::Clock;
use crate::sync::google_api::{
    ApiError, CalendarApi, EventPage, EventQuery, RemoteCalendar, RemoteEvent, RemoteEventPayload,
};
use crate::sync::rate_limiter::RateLimiter;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Every remote call goes through here: throttled by the shared limiter,
/// retried after rate limiting without limit, and retried with backoff for
/// transient failures up to the policy's budget.
pub struct RemoteGateway {
    api: Arc<dyn CalendarApi>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl RemoteGateway {
    pub fn new(
        api: Arc<dyn CalendarApi>,
        limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            api,
            limiter,
            clock,
            policy,
        }
    }

    async fn call<T, F, Fut>(&self, label: &str, op: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;

        loop {
            self.limiter.throttle().await;

            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if error.is_rate_limited() {
                tracing::warn!("{} was rate limited, retrying in the next minute", label);
                self.limiter.wait_for_next_window().await;
                continue;
            }

            if error.is_not_found() {
                return Err(error);
            }

            attempt += 1;
            if !error.is_transient() || attempt >= self.policy.max_attempts {
                tracing::error!("{} failed after {} attempt(s): {}", label, attempt, error);
                return Err(error);
            }

            let delay = self.policy.delay_after(attempt);
            tracing::warn!("{} failed ({}), retrying in {:?}", label, error, delay);
            self.clock.sleep(delay).await;
        }
    }

    pub async fn list_events(&self, calendar_id: &str, query: &EventQuery) -> Result<EventPage, ApiError> {
        self.call("listEvents", || self.api.list_events(calendar_id, query)).await
    }

    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<RemoteEvent, ApiError> {
        self.call("getEvent", || self.api.get_event(calendar_id, event_id)).await
    }

    pub async fn create_event(
        &self,
        calendar_id: &str,
        payload: &RemoteEventPayload,
    ) -> Result<RemoteEvent, ApiError> {
        self.call("createEvent", || self.api.create_event(calendar_id, payload)).await
    }

    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        payload: &RemoteEventPayload,
    ) -> Result<RemoteEvent, ApiError> {
        self.call("updateEvent", || self.api.update_event(calendar_id, event_id, payload))
            .await
    }

    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), ApiError> {
        self.call("deleteEvent", || self.api.delete_event(calendar_id, event_id)).await
    }

    pub async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>, ApiError> {
        self.call("listCalendars", || self.api.list_calendars()).await
    }
}
