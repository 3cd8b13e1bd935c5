use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono_tz::Tz;
use thiserror::Error;

use crate::calendar::{Calendar, Event};
use crate::storage::config::{Config, SyncConfig};
use crate::storage::{CalendarStore, StoreError};
use crate::sync::clock::{Clock, SystemClock};
use crate::sync::direction::{SyncDirection, SyncPlan};
use crate::sync::export::{self, ExportEngine, PassStats, SkipReason};
use crate::sync::google_api::{ApiError, CalendarApi, RemoteCalendar};
use crate::sync::google_auth::AuthError;
use crate::sync::import::ImportEngine;
use crate::sync::origin;
use crate::sync::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::sync::remote::{RemoteGateway, RetryPolicy};
use crate::sync::translator::{EventTranslator, TranslateError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Translation error: {0}")]
    Translate(#[from] TranslateError),
    #[error("Unknown time zone: {0}")]
    InvalidTimeZone(String),
    #[error("Calendar {0} not found")]
    CalendarNotFound(i64),
    #[error("Event {0} not found")]
    EventNotFound(i64),
    #[error("Calendar {0} is not configured for this sync direction")]
    SyncNotConfigured(i64),
}

/// Aggregate result of a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced: usize,
    pub errors: usize,
}

/// What a sync of one calendar would do, computed without remote calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarPreview {
    pub calendar_id: i64,
    pub title: String,
    pub import_from: Option<String>,
    pub export_to: Option<String>,
    pub would_export: usize,
    pub would_retract: usize,
    pub skipped: Vec<(SkipReason, usize)>,
}

pub struct SyncEngine {
    settings: SyncConfig,
    store: Box<dyn CalendarStore>,
    remote: Option<RemoteGateway>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    translator: EventTranslator,
    unavailable_logged: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        config: &Config,
        store: Box<dyn CalendarStore>,
        api: Option<Arc<dyn CalendarApi>>,
    ) -> Result<Self, SyncError> {
        Self::with_clock(config, store, api, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &Config,
        store: Box<dyn CalendarStore>,
        api: Option<Arc<dyn CalendarApi>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SyncError> {
        let settings = config.sync.clone();
        let time_zone: Tz = settings
            .time_zone
            .parse()
            .map_err(|_| SyncError::InvalidTimeZone(settings.time_zone.clone()))?;

        let limiter = Arc::new(RateLimiter::new(
            clock.clone(),
            RateLimitConfig {
                min_interval: settings.min_call_delay(),
                max_calls_per_minute: settings.max_calls_per_minute,
            },
        ));

        let mut engine = Self {
            translator: EventTranslator::new(time_zone, settings.busy_text.clone()),
            settings,
            store,
            remote: None,
            limiter,
            clock,
            unavailable_logged: AtomicBool::new(false),
        };
        engine.set_api(api);
        Ok(engine)
    }

    /// Swaps the remote client, e.g. after a token refresh. The rate limiter
    /// carries over.
    pub fn set_api(&mut self, api: Option<Arc<dyn CalendarApi>>) {
        let policy = RetryPolicy {
            max_attempts: self.settings.max_attempts.max(1),
            base_delay: self.settings.retry_base_delay(),
        };
        self.remote = api.map(|api| RemoteGateway::new(api, self.limiter.clone(), self.clock.clone(), policy));
        self.unavailable_logged.store(false, Ordering::Relaxed);
    }

    pub fn store(&self) -> &dyn CalendarStore {
        self.store.as_ref()
    }

    fn gateway(&self) -> Option<&RemoteGateway> {
        if self.remote.is_none() && !self.unavailable_logged.swap(true, Ordering::Relaxed) {
            tracing::warn!("No remote calendar client available, sync is disabled");
        }
        self.remote.as_ref()
    }

    fn exporter<'a>(&'a self, remote: &'a RemoteGateway) -> ExportEngine<'a> {
        ExportEngine::new(
            self.store.as_ref(),
            remote,
            &self.translator,
            self.clock.as_ref(),
            self.settings.horizon_span(),
        )
    }

    /// Import engine for `plan`, cross-exporting when the plan has a distinct
    /// export target and the configuration allows it.
    fn importer<'a>(
        &'a self,
        remote: &'a RemoteGateway,
        exporter: &'a ExportEngine<'a>,
        plan: &SyncPlan,
    ) -> ImportEngine<'a> {
        let importer = ImportEngine::new(
            self.store.as_ref(),
            remote,
            &self.translator,
            self.clock.as_ref(),
            self.settings.horizon_span(),
            self.settings.page_size,
        );

        match plan.cross_export_target() {
            Some(target) if self.settings.cross_export_on_import => importer.with_cross_export(exporter, target),
            _ => importer.with_exporter(exporter),
        }
    }

    fn load_calendar(&self, id: i64) -> Result<Calendar, SyncError> {
        self.store.calendar(id)?.ok_or(SyncError::CalendarNotFound(id))
    }

    fn load_event(&self, id: i64) -> Result<Event, SyncError> {
        self.store.event(id)?.ok_or(SyncError::EventNotFound(id))
    }

    fn selected_calendars(&self, calendar_id: Option<i64>) -> Result<Vec<Calendar>, SyncError> {
        match calendar_id {
            Some(id) => Ok(vec![self.load_calendar(id)?].into_iter().filter(|c| c.sync_enabled).collect()),
            None => Ok(self.store.sync_enabled_calendars()?),
        }
    }

    fn stamp_last_sync(&self, calendar: &mut Calendar) -> Result<(), SyncError> {
        calendar.last_sync = Some(self.clock.now());
        self.store.save_calendar(calendar)?;
        Ok(())
    }

    /// Imports then exports every selected calendar with sync enabled.
    ///
    /// Failures are isolated per calendar and only show up in the counts.
    pub async fn run_sync(&self, calendar_id: Option<i64>, direction: Option<SyncDirection>) -> SyncSummary {
        let mut summary = SyncSummary::default();

        let Some(remote) = self.gateway() else {
            return summary;
        };

        let calendars = match self.selected_calendars(calendar_id) {
            Ok(calendars) => calendars,
            Err(e) => {
                tracing::error!("Could not load calendars for sync: {}", e);
                summary.errors += 1;
                return summary;
            }
        };

        let direction = direction.unwrap_or_default();
        tracing::info!("Starting {:?} sync of {} calendar(s)", direction, calendars.len());

        for mut calendar in calendars {
            let full_plan = SyncPlan::resolve(&calendar);
            if full_plan.is_empty() {
                tracing::warn!("Calendar {} has sync enabled but no remote calendar set", calendar.id);
                summary.errors += 1;
                continue;
            }

            let plan = full_plan.restrict(direction);
            if plan.is_empty() {
                continue;
            }

            match self.sync_calendar(remote, &calendar, &plan).await {
                Ok(stats) => {
                    summary.synced += stats.synced + stats.removed;
                    summary.errors += stats.failed;
                    if let Err(e) = self.stamp_last_sync(&mut calendar) {
                        tracing::error!("Could not record sync time of calendar {}: {}", calendar.id, e);
                        summary.errors += 1;
                    }
                }
                Err(e) => {
                    tracing::error!("Sync of calendar {} failed: {}", calendar.id, e);
                    summary.errors += 1;
                }
            }
        }

        tracing::info!(synced = summary.synced, errors = summary.errors, "Sync finished");
        summary
    }

    async fn sync_calendar(
        &self,
        remote: &RemoteGateway,
        calendar: &Calendar,
        plan: &SyncPlan,
    ) -> Result<PassStats, SyncError> {
        let exporter = self.exporter(remote);
        let mut stats = PassStats::default();

        if plan.shares_remote_calendar() {
            tracing::debug!("Calendar {} imports and exports the same remote calendar", calendar.id);
        }

        if let Some(source) = plan.import.as_deref() {
            let importer = self.importer(remote, &exporter, plan);
            stats.merge(importer.import_calendar(calendar, source).await?);
        }

        if let Some(target) = plan.export.as_deref() {
            stats.merge(exporter.export_calendar(calendar, target).await?);
        }

        Ok(stats)
    }

    /// Dry run: resolves directions and export skip rules without touching
    /// the remote side.
    pub fn preview_sync(
        &self,
        calendar_id: Option<i64>,
        direction: Option<SyncDirection>,
    ) -> Result<Vec<CalendarPreview>, SyncError> {
        let direction = direction.unwrap_or_default();
        let now = self.clock.now();
        let mut previews = Vec::new();

        for calendar in self.selected_calendars(calendar_id)? {
            let plan = SyncPlan::resolve(&calendar).restrict(direction);
            let mut preview = CalendarPreview {
                calendar_id: calendar.id,
                title: calendar.title.clone(),
                import_from: plan.import.clone(),
                export_to: plan.export.clone(),
                would_export: 0,
                would_retract: 0,
                skipped: Vec::new(),
            };

            if let Some(target) = plan.export.as_deref() {
                for event in self.store.events_for_calendar(calendar.id)? {
                    if export::needs_retraction(&event, now) {
                        preview.would_retract += 1;
                        continue;
                    }
                    match export::skip_reason(
                        &event,
                        &calendar,
                        target,
                        now,
                        self.translator.time_zone(),
                        self.settings.horizon_span(),
                    ) {
                        None => preview.would_export += 1,
                        Some(reason) => match preview.skipped.iter_mut().find(|(r, _)| *r == reason) {
                            Some((_, count)) => *count += 1,
                            None => preview.skipped.push((reason, 1)),
                        },
                    }
                }
                preview.skipped.sort();
            }

            previews.push(preview);
        }

        Ok(previews)
    }

    /// Runs only the import direction of one calendar.
    pub async fn import_calendar(&self, calendar_id: i64) -> Result<usize, SyncError> {
        let mut calendar = self.load_calendar(calendar_id)?;
        let plan = SyncPlan::resolve(&calendar);
        let source = plan.import.clone().ok_or(SyncError::SyncNotConfigured(calendar_id))?;

        let Some(remote) = self.gateway() else {
            return Ok(0);
        };

        let exporter = self.exporter(remote);
        let stats = self
            .importer(remote, &exporter, &plan)
            .import_calendar(&calendar, &source)
            .await?;
        self.stamp_last_sync(&mut calendar)?;
        Ok(stats.synced + stats.removed)
    }

    /// Runs only the export direction of one calendar.
    pub async fn export_calendar(&self, calendar_id: i64) -> Result<usize, SyncError> {
        let mut calendar = self.load_calendar(calendar_id)?;
        let target = SyncPlan::resolve(&calendar)
            .export
            .ok_or(SyncError::SyncNotConfigured(calendar_id))?;

        let Some(remote) = self.gateway() else {
            return Ok(0);
        };

        let stats = self.exporter(remote).export_calendar(&calendar, &target).await?;
        self.stamp_last_sync(&mut calendar)?;
        Ok(stats.synced + stats.removed)
    }

    /// Call after the host application saved a user edit. Marks the event as
    /// locally owned and pushes the change (or the retraction) right away.
    pub async fn record_local_edit(&self, event_id: i64) -> Result<Option<String>, SyncError> {
        let mut event = self.load_event(event_id)?;
        origin::record_local_edit(&mut event, self.clock.now());
        self.store.save_event(&event)?;

        let calendar = self.load_calendar(event.calendar_id)?;
        let Some(target) = SyncPlan::resolve(&calendar).export else {
            return Ok(None);
        };
        let Some(remote) = self.gateway() else {
            return Ok(None);
        };
        let exporter = self.exporter(remote);

        if export::needs_retraction(&event, self.clock.now()) {
            exporter.retract_event(&mut event, &target).await?;
            return Ok(None);
        }

        let outcome = exporter.export_event(&mut event, &calendar, &target).await?;
        Ok(outcome.remote_id().map(str::to_string))
    }

    /// Call after the host application deleted an event. Removes its export
    /// copy; returns whether nothing remote is left behind.
    pub async fn event_deleted(&self, event: &Event) -> Result<bool, SyncError> {
        let Some(remote_id) = event.remote_export_id.as_deref() else {
            return Ok(true);
        };
        let calendar = self.load_calendar(event.calendar_id)?;
        let Some(target) = calendar.export_calendar.as_deref() else {
            tracing::warn!("Event {} was exported but its calendar has no export target", event.id);
            return Ok(false);
        };
        let Some(remote) = self.gateway() else {
            return Ok(false);
        };

        Ok(self.exporter(remote).delete_remote(target, remote_id).await)
    }

    /// Call after the host application duplicated an event into `event_id`.
    /// The copy starts out with no remote links.
    pub fn event_copied(&self, event_id: i64) -> Result<(), SyncError> {
        let mut event = self.load_event(event_id)?;
        event.reset_sync_state();
        event.modified_at = self.clock.now();
        self.store.save_event(&event)?;
        Ok(())
    }

    pub async fn list_remote_calendars(&self) -> Result<Vec<RemoteCalendar>, SyncError> {
        match self.gateway() {
            Some(remote) => Ok(remote.list_calendars().await?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{EventTime, Origin};
    use crate::storage::SqliteStore;
    use crate::test_support::{civil, date, edited_at, remote_timed, Call, FakeCalendarApi, ManualClock};
    use pretty_assertions::assert_eq;

    fn config() -> Config {
        let mut config = Config::default();
        config.sync.min_call_delay_ms = 0;
        config
    }

    fn engine(api: Option<Arc<FakeCalendarApi>>) -> (SyncEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at(2025, 6, 1, 8, 0, 0));
        let store = SqliteStore::open_in_memory().unwrap();
        let api = api.map(|a| a as Arc<dyn CalendarApi>);
        let engine = SyncEngine::with_clock(&config(), Box::new(store), api, clock.clone()).unwrap();
        (engine, clock)
    }

    fn add_calendar(engine: &SyncEngine, import: Option<&str>, export: Option<&str>) -> Calendar {
        let mut calendar = Calendar::new("Team");
        calendar.sync_enabled = true;
        calendar.import_calendar = import.map(str::to_string);
        calendar.export_calendar = export.map(str::to_string);
        engine.store().insert_calendar(calendar).unwrap()
    }

    fn add_event(engine: &SyncEngine, calendar: &Calendar, title: &str) -> Event {
        let event = Event::new(calendar.id, title, EventTime::Date(date(2025, 6, 10)), edited_at());
        engine.store().insert_event(event).unwrap()
    }

    #[test]
    fn unknown_time_zone_is_rejected() {
        let mut config = config();
        config.sync.time_zone = "Mars/Olympus".to_string();
        let store = SqliteStore::open_in_memory().unwrap();

        let result = SyncEngine::new(&config, Box::new(store), None);

        assert!(matches!(result, Err(SyncError::InvalidTimeZone(zone)) if zone == "Mars/Olympus"));
    }

    #[tokio::test]
    async fn missing_client_yields_neutral_results() {
        let (engine, _) = engine(None);
        let calendar = add_calendar(&engine, Some("src"), Some("dst"));
        add_event(&engine, &calendar, "Planning");

        assert_eq!(engine.run_sync(None, None).await, SyncSummary::default());
        assert_eq!(engine.export_calendar(calendar.id).await.unwrap(), 0);
        assert!(engine.list_remote_calendars().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_sync_imports_then_exports_and_stamps_calendars() {
        let api = Arc::new(FakeCalendarApi::new());
        api.insert(
            "src",
            remote_timed("r1", "Remote", civil(2025, 6, 12, 9, 0), civil(2025, 6, 12, 10, 0)),
        );
        let (engine, clock) = engine(Some(api.clone()));
        let calendar = add_calendar(&engine, Some("src"), Some("dst"));
        add_event(&engine, &calendar, "Local");

        let summary = engine.run_sync(None, None).await;

        assert_eq!(summary, SyncSummary { synced: 2, errors: 0 });
        assert_eq!(api.live_events("dst").len(), 2);
        assert_eq!(
            engine.store().calendar(calendar.id).unwrap().unwrap().last_sync,
            Some(clock.now())
        );
        let list_index = api.calls().iter().position(|c| matches!(c, Call::List { .. })).unwrap();
        let create_index = api.calls().iter().position(|c| matches!(c, Call::Create { .. })).unwrap();
        assert!(list_index < create_index);
    }

    #[tokio::test]
    async fn same_calendar_round_trip_does_not_loop() {
        let api = Arc::new(FakeCalendarApi::new());
        api.insert(
            "shared",
            remote_timed("r1", "Remote", civil(2025, 6, 12, 9, 0), civil(2025, 6, 12, 10, 0)),
        );
        let (engine, _) = engine(Some(api.clone()));
        let calendar = add_calendar(&engine, Some("shared"), Some("shared"));
        add_event(&engine, &calendar, "Local");

        engine.run_sync(None, None).await;
        api.clear_calls();
        let second = engine.run_sync(None, None).await;

        let events = engine.store().events_for_calendar(calendar.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(api.live_events("shared").len(), 2);
        assert!(api.writes().is_empty());
        assert_eq!(second, SyncSummary { synced: 0, errors: 0 });
    }

    #[tokio::test]
    async fn one_failing_calendar_does_not_stop_the_batch() {
        let api = Arc::new(FakeCalendarApi::new());
        let (engine, _) = engine(Some(api.clone()));
        let broken = add_calendar(&engine, Some("src"), None);
        let healthy = add_calendar(&engine, None, Some("dst"));
        add_event(&engine, &healthy, "Local");
        api.fail_next(ApiError::Rejected {
            status: 400,
            body: "bad calendar".to_string(),
        });

        let summary = engine.run_sync(None, None).await;

        assert_eq!(summary, SyncSummary { synced: 1, errors: 1 });
        assert!(engine.store().calendar(broken.id).unwrap().unwrap().last_sync.is_none());
        assert!(engine.store().calendar(healthy.id).unwrap().unwrap().last_sync.is_some());
    }

    #[tokio::test]
    async fn enabled_calendar_without_remote_counts_as_error() {
        let api = Arc::new(FakeCalendarApi::new());
        let (engine, _) = engine(Some(api));
        add_calendar(&engine, None, None);

        assert_eq!(engine.run_sync(None, None).await, SyncSummary { synced: 0, errors: 1 });
    }

    #[tokio::test]
    async fn direction_and_selector_limit_the_run() {
        let api = Arc::new(FakeCalendarApi::new());
        api.insert(
            "src",
            remote_timed("r1", "Remote", civil(2025, 6, 12, 9, 0), civil(2025, 6, 12, 10, 0)),
        );
        let (engine, _) = engine(Some(api.clone()));
        let first = add_calendar(&engine, Some("src"), Some("dst"));
        let second = add_calendar(&engine, None, Some("other"));
        add_event(&engine, &first, "Local");
        add_event(&engine, &second, "Elsewhere");

        engine.run_sync(Some(first.id), Some(SyncDirection::Export)).await;

        assert!(api.calls().iter().all(|c| !matches!(c, Call::List { .. })));
        assert_eq!(api.live_events("dst").len(), 1);
        assert!(api.live_events("other").is_empty());
    }

    #[tokio::test]
    async fn preview_makes_no_remote_calls() {
        let api = Arc::new(FakeCalendarApi::new());
        let (engine, _) = engine(Some(api.clone()));
        let calendar = add_calendar(&engine, Some("src"), Some("dst"));
        add_event(&engine, &calendar, "Local");
        let mut hidden = add_event(&engine, &calendar, "Hidden");
        hidden.published = false;
        engine.store().save_event(&hidden).unwrap();

        let previews = engine.preview_sync(None, None).unwrap();

        assert!(api.calls().is_empty());
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].import_from.as_deref(), Some("src"));
        assert_eq!(previews[0].would_export, 1);
        assert_eq!(previews[0].skipped, vec![(SkipReason::Unpublished, 1)]);
    }

    #[tokio::test]
    async fn manual_trigger_requires_configured_direction() {
        let api = Arc::new(FakeCalendarApi::new());
        let (engine, _) = engine(Some(api));
        let calendar = add_calendar(&engine, None, Some("dst"));

        assert!(matches!(
            engine.import_calendar(calendar.id).await,
            Err(SyncError::SyncNotConfigured(id)) if id == calendar.id
        ));
        assert!(matches!(engine.export_calendar(999).await, Err(SyncError::CalendarNotFound(999))));
    }

    #[tokio::test]
    async fn local_edit_of_imported_event_is_exported_to_source() {
        let api = Arc::new(FakeCalendarApi::new());
        api.insert(
            "shared",
            remote_timed("r1", "Remote", civil(2025, 6, 12, 9, 0), civil(2025, 6, 12, 10, 0)),
        );
        let (engine, clock) = engine(Some(api.clone()));
        let calendar = add_calendar(&engine, Some("shared"), Some("shared"));
        engine.import_calendar(calendar.id).await.unwrap();
        let imported = engine.store().events_for_calendar(calendar.id).unwrap().remove(0);
        assert_eq!(imported.origin, Origin::Remote);

        clock.advance(std::time::Duration::from_secs(30));
        let remote_id = engine.record_local_edit(imported.id).await.unwrap();

        let stored = engine.store().event(imported.id).unwrap().unwrap();
        assert_eq!(stored.origin, Origin::Local);
        assert_eq!(stored.remote_export_id, remote_id);
        assert!(remote_id.is_some());
    }

    #[tokio::test]
    async fn unpublishing_through_edit_hook_retracts() {
        let api = Arc::new(FakeCalendarApi::new());
        let (engine, _) = engine(Some(api.clone()));
        let calendar = add_calendar(&engine, None, Some("dst"));
        let event = add_event(&engine, &calendar, "Local");
        engine.export_calendar(calendar.id).await.unwrap();
        let mut event = engine.store().event(event.id).unwrap().unwrap();
        let remote_id = event.remote_export_id.clone().unwrap();
        event.published = false;
        engine.store().save_event(&event).unwrap();

        let result = engine.record_local_edit(event.id).await.unwrap();

        assert_eq!(result, None);
        assert!(api.event("dst", &remote_id).unwrap().is_cancelled());
        assert_eq!(engine.store().event(event.id).unwrap().unwrap().remote_export_id, None);
    }

    #[tokio::test]
    async fn deleted_event_removes_export_copy() {
        let api = Arc::new(FakeCalendarApi::new());
        let (engine, _) = engine(Some(api.clone()));
        let calendar = add_calendar(&engine, None, Some("dst"));
        let event = add_event(&engine, &calendar, "Local");
        engine.export_calendar(calendar.id).await.unwrap();
        let event = engine.store().event(event.id).unwrap().unwrap();
        engine.store().delete_event(event.id).unwrap();

        assert!(engine.event_deleted(&event).await.unwrap());
        assert!(api.live_events("dst").is_empty());
    }

    #[tokio::test]
    async fn copied_event_forgets_remote_links() {
        let (engine, clock) = engine(None);
        let calendar = add_calendar(&engine, Some("src"), Some("dst"));
        let mut copy = add_event(&engine, &calendar, "Copy");
        copy.remote_import_id = Some("r1".to_string());
        copy.remote_export_id = Some("e1".to_string());
        copy.remote_source_calendar = Some("src".to_string());
        copy.origin = Origin::Remote;
        copy.last_synced_at = Some(clock.now());
        engine.store().save_event(&copy).unwrap();

        engine.event_copied(copy.id).unwrap();

        let stored = engine.store().event(copy.id).unwrap().unwrap();
        assert_eq!(stored.remote_import_id, None);
        assert_eq!(stored.remote_export_id, None);
        assert_eq!(stored.remote_source_calendar, None);
        assert_eq!(stored.last_synced_at, None);
        assert_eq!(stored.origin, Origin::Local);
    }

    #[tokio::test]
    async fn remote_calendars_are_listed() {
        let api = Arc::new(FakeCalendarApi::new());
        api.add_calendar(RemoteCalendar {
            id: "team".to_string(),
            summary: "Team".to_string(),
            description: None,
            primary: false,
        });
        let (engine, _) = engine(Some(api));

        let calendars = engine.list_remote_calendars().await.unwrap();

        assert_eq!(calendars.len(), 1);
        assert_eq!(calendars[0].id, "team");
    }
}
