use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::sync::clock::{until_next_minute, Clock};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub min_interval: Duration,
    pub max_calls_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(500),
            max_calls_per_minute: 590,
        }
    }
}

#[derive(Debug, Default)]
struct Window {
    minute: i64,
    calls: u32,
    last_call: Option<DateTime<Utc>>,
}

impl Window {
    fn roll(&mut self, now: DateTime<Utc>) {
        let minute = now.timestamp().div_euclid(60);
        if minute != self.minute {
            self.minute = minute;
            self.calls = 0;
        }
    }
}

/// Paces every remote call made by the process.
///
/// One instance is shared by all engines; the window is held under a lock for
/// the whole wait so concurrent callers queue behind each other.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>, config: RateLimitConfig) -> Self {
        Self {
            clock,
            config,
            window: Mutex::new(Window::default()),
        }
    }

    /// Waits until one more call may be issued and records it.
    pub async fn throttle(&self) {
        let mut window = self.window.lock().await;
        let mut now = self.clock.now();
        window.roll(now);

        if window.calls >= self.config.max_calls_per_minute {
            let wait = until_next_minute(now);
            tracing::info!(
                calls_this_minute = window.calls,
                "Per-minute call budget reached, waiting {:?}",
                wait
            );
            self.clock.sleep(wait).await;
            now = self.clock.now();
            window.roll(now);
        }

        if let Some(last) = window.last_call {
            let since = (now - last).to_std().unwrap_or_default();
            if since < self.config.min_interval {
                self.clock.sleep(self.config.min_interval - since).await;
                now = self.clock.now();
                window.roll(now);
            }
        }

        window.last_call = Some(now);
        window.calls += 1;
    }

    /// Sleeps through the rest of the current minute and starts a fresh budget.
    /// Used after the provider has already refused a call.
    pub async fn wait_for_next_window(&self) {
        let mut window = self.window.lock().await;
        let wait = until_next_minute(self.clock.now());
        tracing::warn!("Rate limited by provider, waiting {:?} for the next minute", wait);
        self.clock.sleep(wait).await;
        window.roll(self.clock.now());
        window.calls = 0;
    }

    pub async fn calls_this_minute(&self) -> u32 {
        let mut window = self.window.lock().await;
        window.roll(self.clock.now());
        window.calls
    }
}
