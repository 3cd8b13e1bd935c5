use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of wall-clock time and suspension for everything that paces or
/// timestamps remote calls.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Time left until the start of the next UTC minute.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let elapsed = now.timestamp().rem_euclid(60);
    let boundary = DateTime::<Utc>::from_timestamp(now.timestamp() - elapsed + 60, 0).unwrap_or(now);
    (boundary - now).to_std().unwrap_or_default()
}
