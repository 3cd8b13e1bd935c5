pub mod clock;
pub mod direction;
pub mod export;
pub mod google_api;
pub mod google_auth;
pub mod import;
pub mod origin;
pub mod rate_limiter;
pub mod remote;
pub mod sync_engine;
pub mod translator;

pub use clock::{Clock, SystemClock};
pub use direction::{SyncDirection, SyncPlan};
pub use export::{ExportEngine, ExportOutcome, PassStats, SkipReason};
pub use google_api::{ApiError, CalendarApi, GoogleCalendarClient, RemoteCalendar, RemoteEvent};
pub use google_auth::{AuthError, GoogleAuthenticator, TokenInfo};
pub use import::ImportEngine;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use sync_engine::{CalendarPreview, SyncEngine, SyncError, SyncSummary};
