use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};

use crate::calendar::{Calendar, Event, Origin};
use crate::storage::CalendarStore;
use crate::sync::clock::Clock;
use crate::sync::export::{ExportEngine, PassStats};
use crate::sync::google_api::{EventQuery, RemoteEvent};
use crate::sync::origin;
use crate::sync::remote::RemoteGateway;
use crate::sync::sync_engine::SyncError;
use crate::sync::translator::EventTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportOutcome {
    Created,
    Updated,
    Unchanged,
    LocallyOwned,
    Reflection,
}

pub struct ImportEngine<'a> {
    store: &'a dyn CalendarStore,
    remote: &'a RemoteGateway,
    translator: &'a EventTranslator,
    clock: &'a dyn Clock,
    horizon_span: chrono::Duration,
    page_size: u32,
    exporter: Option<&'a ExportEngine<'a>>,
    cross_export_target: Option<String>,
}

impl<'a> ImportEngine<'a> {
    pub fn new(
        store: &'a dyn CalendarStore,
        remote: &'a RemoteGateway,
        translator: &'a EventTranslator,
        clock: &'a dyn Clock,
        horizon_span: chrono::Duration,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            remote,
            translator,
            clock,
            horizon_span,
            page_size,
            exporter: None,
            cross_export_target: None,
        }
    }

    /// Lets cleanup delete the export copies of vanished imports.
    pub fn with_exporter(mut self, exporter: &'a ExportEngine<'a>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Pushes every created or updated event on to `target` right away.
    pub fn with_cross_export(mut self, exporter: &'a ExportEngine<'a>, target: impl Into<String>) -> Self {
        self.exporter = Some(exporter);
        self.cross_export_target = Some(target.into());
        self
    }

    /// Imports `source` into `calendar`, then deletes local imports whose
    /// remote counterpart has disappeared.
    ///
    /// A failed page aborts the pass before cleanup so a partial listing never
    /// deletes anything.
    pub async fn import_calendar(&self, calendar: &Calendar, source: &str) -> Result<PassStats, SyncError> {
        let now = self.clock.now();
        let today = now.with_timezone(&self.translator.time_zone()).date_naive();
        let window_start = self
            .translator
            .time_zone()
            .from_local_datetime(&today.and_time(chrono::NaiveTime::MIN))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);
        let window_end = calendar.horizon(now, self.horizon_span);

        let (remote_events, unreadable) = self.fetch_all(source, window_start, window_end).await?;
        tracing::info!(
            "Fetched {} remote events from {} for calendar {}",
            remote_events.len(),
            source,
            calendar.id
        );

        let mut stats = PassStats::default();
        let mut seen: HashSet<String> = unreadable.into_iter().collect();
        let mut materialized: HashSet<String> = HashSet::new();
        let mut masters: HashMap<String, Option<RemoteEvent>> = HashMap::new();

        for remote in &remote_events {
            if remote.is_cancelled() {
                continue;
            }

            seen.insert(remote.id.clone());
            seen.insert(remote.series_id().to_string());

            if !materialized.insert(remote.series_id().to_string()) {
                continue;
            }

            match self.import_event(calendar, source, remote, &mut masters).await {
                Ok(ImportOutcome::Created) | Ok(ImportOutcome::Updated) => stats.synced += 1,
                Ok(outcome) => {
                    tracing::debug!("Remote event {} not imported: {:?}", remote.id, outcome);
                    stats.skipped += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to import remote event {}: {}", remote.id, e);
                    stats.failed += 1;
                }
            }
        }

        let cleanup = self.remove_vanished(calendar, &seen, today).await?;
        stats.merge(cleanup);

        tracing::info!(
            synced = stats.synced,
            removed = stats.removed,
            failed = stats.failed,
            "Import of {} into calendar {} finished",
            source,
            calendar.id
        );
        Ok(stats)
    }

    /// Every page of the window, plus the ids of listed items that could not
    /// be read. Those keep their local copies alive during cleanup.
    async fn fetch_all(
        &self,
        source: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<(Vec<RemoteEvent>, Vec<String>), SyncError> {
        let mut query = EventQuery {
            time_min,
            time_max,
            show_deleted: true,
            expand_recurring: true,
            max_results: self.page_size,
            page_token: None,
        };
        let mut events = Vec::new();
        let mut unreadable = Vec::new();

        loop {
            let page = self.remote.list_events(source, &query).await?;
            events.extend(page.events);
            unreadable.extend(page.unreadable_ids);

            match page.next_page_token {
                Some(token) => query.page_token = Some(token),
                None => return Ok((events, unreadable)),
            }
        }
    }

    async fn import_event(
        &self,
        calendar: &Calendar,
        source: &str,
        remote: &RemoteEvent,
        masters: &mut HashMap<String, Option<RemoteEvent>>,
    ) -> Result<ImportOutcome, SyncError> {
        if let Some(local) = origin::exported_counterpart(self.store, remote)? {
            tracing::debug!("Remote event {} is the export of local event {}", remote.id, local.id);
            return Ok(ImportOutcome::Reflection);
        }

        let existing = match self.store.find_by_import_id(calendar.id, &remote.id)? {
            Some(event) => Some(event),
            None => self.store.find_by_import_id(calendar.id, remote.series_id())?,
        };

        if let Some(local) = &existing {
            if local.origin == Origin::Local {
                return Ok(ImportOutcome::LocallyOwned);
            }
            let newer = match (remote.updated, local.last_synced_at) {
                (_, None) => true,
                (Some(updated), Some(synced)) => updated > synced,
                (None, Some(_)) => false,
            };
            if !newer {
                return Ok(ImportOutcome::Unchanged);
            }
        }

        let master = match &remote.recurring_event_id {
            Some(series) => self.master(source, series, masters).await,
            None => None,
        };
        let fields = self.translator.from_remote(remote, master.as_ref())?;
        let now = self.clock.now();

        let (mut event, outcome) = match existing {
            Some(mut event) => {
                fields.apply_to(&mut event);
                event.last_synced_at = Some(remote.updated.unwrap_or(now));
                event.modified_at = now;
                self.store.save_event(&event)?;
                tracing::info!("Updated local event {} from {}", event.id, remote.id);
                (event, ImportOutcome::Updated)
            }
            None => {
                let mut event = Event::new(calendar.id, String::new(), fields.start, now);
                fields.apply_to(&mut event);
                event.published = true;
                event.origin = Origin::Remote;
                event.remote_source_calendar = Some(source.to_string());
                event.remote_import_id = Some(remote.series_id().to_string());
                event.last_synced_at = Some(remote.updated.unwrap_or(now));
                let event = self.store.insert_event(event)?;
                tracing::info!("Imported {} as local event {}", remote.id, event.id);
                (event, ImportOutcome::Created)
            }
        };

        if let (Some(exporter), Some(target)) = (self.exporter, self.cross_export_target.as_deref()) {
            if let Err(e) = exporter.export_event(&mut event, calendar, target).await {
                tracing::error!("Imported local event {} could not be exported to {}: {}", event.id, target, e);
            }
        }

        Ok(outcome)
    }

    /// Series master for an expanded instance, fetched once per pass.
    async fn master(
        &self,
        source: &str,
        series: &str,
        masters: &mut HashMap<String, Option<RemoteEvent>>,
    ) -> Option<RemoteEvent> {
        if let Some(cached) = masters.get(series) {
            return cached.clone();
        }

        let master = match self.remote.get_event(source, series).await {
            Ok(master) => Some(master),
            Err(e) => {
                tracing::warn!("Could not load series master {}: {}", series, e);
                None
            }
        };
        masters.insert(series.to_string(), master.clone());
        master
    }

    async fn remove_vanished(
        &self,
        calendar: &Calendar,
        seen: &HashSet<String>,
        today: chrono::NaiveDate,
    ) -> Result<PassStats, SyncError> {
        let mut stats = PassStats::default();

        for event in self.store.events_for_calendar(calendar.id)? {
            let Some(import_id) = event.remote_import_id.as_deref() else {
                continue;
            };
            if seen.contains(import_id) || event.start.date() < today {
                continue;
            }

            if let Some(remote_id) = event.remote_export_id.as_deref() {
                let deleted = match (self.exporter, calendar.export_calendar.as_deref()) {
                    (Some(exporter), Some(target)) => exporter.delete_remote(target, remote_id).await,
                    _ => {
                        tracing::warn!(
                            "Local event {} has export copy {} but no exporter is available",
                            event.id,
                            remote_id
                        );
                        false
                    }
                };
                if !deleted {
                    stats.failed += 1;
                    continue;
                }
            }

            match self.store.delete_event(event.id) {
                Ok(()) => {
                    tracing::info!("Removed local event {}: {} vanished remotely", event.id, import_id);
                    stats.removed += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to remove local event {}: {}", event.id, e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}
