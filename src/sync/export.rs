use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::calendar::{Calendar, Event};
use crate::storage::CalendarStore;
use crate::sync::clock::Clock;
use crate::sync::origin;
use crate::sync::remote::RemoteGateway;
use crate::sync::sync_engine::SyncError;
use crate::sync::translator::EventTranslator;

/// Why an event was left alone. Variants are checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    Unpublished,
    ExportLoop,
    RecurrenceEnded,
    BeyondHorizon,
    Unchanged,
}

/// First skip rule matching `event` for an export to `target`.
pub fn skip_reason(
    event: &Event,
    calendar: &Calendar,
    target: &str,
    now: DateTime<Utc>,
    zone: Tz,
    horizon_span: chrono::Duration,
) -> Option<SkipReason> {
    if !event.published {
        Some(SkipReason::Unpublished)
    } else if origin::is_export_loop(event, target) {
        Some(SkipReason::ExportLoop)
    } else if event.recurrence_ended(now) {
        Some(SkipReason::RecurrenceEnded)
    } else if event.start.to_utc(zone) > calendar.horizon(now, horizon_span) {
        Some(SkipReason::BeyondHorizon)
    } else if event.unchanged_since_sync() {
        Some(SkipReason::Unchanged)
    } else {
        None
    }
}

/// An event whose remote copy has to go: unpublished, or a series that ended.
pub fn needs_retraction(event: &Event, now: DateTime<Utc>) -> bool {
    event.remote_export_id.is_some() && (!event.published || event.recurrence_ended(now))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(String),
    Unchanged(String),
    Skipped(SkipReason),
    Failed,
}

impl ExportOutcome {
    /// Remote id the event now lives under, if it was (or already is) exported.
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            ExportOutcome::Written(id) | ExportOutcome::Unchanged(id) => Some(id),
            ExportOutcome::Skipped(_) | ExportOutcome::Failed => None,
        }
    }
}

/// Tally of one import or export pass over a calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub synced: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PassStats {
    pub fn merge(&mut self, other: PassStats) {
        self.synced += other.synced;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

pub struct ExportEngine<'a> {
    store: &'a dyn CalendarStore,
    remote: &'a RemoteGateway,
    translator: &'a EventTranslator,
    clock: &'a dyn Clock,
    horizon_span: chrono::Duration,
}

impl<'a> ExportEngine<'a> {
    pub fn new(
        store: &'a dyn CalendarStore,
        remote: &'a RemoteGateway,
        translator: &'a EventTranslator,
        clock: &'a dyn Clock,
        horizon_span: chrono::Duration,
    ) -> Self {
        Self {
            store,
            remote,
            translator,
            clock,
            horizon_span,
        }
    }

    /// Creates or updates the remote copy of `event` in `target`.
    ///
    /// Remote failures are logged and reported as [`ExportOutcome::Failed`];
    /// only local persistence errors are returned.
    pub async fn export_event(
        &self,
        event: &mut Event,
        calendar: &Calendar,
        target: &str,
    ) -> Result<ExportOutcome, SyncError> {
        let now = self.clock.now();

        if let Some(reason) = skip_reason(
            event,
            calendar,
            target,
            now,
            self.translator.time_zone(),
            self.horizon_span,
        ) {
            tracing::debug!("Skipping export of event {}: {:?}", event.id, reason);
            return Ok(match (reason, event.remote_export_id.clone()) {
                (SkipReason::Unchanged, Some(id)) => ExportOutcome::Unchanged(id),
                _ => ExportOutcome::Skipped(reason),
            });
        }

        let payload = self.translator.to_remote(event, calendar);

        let written = match event.remote_export_id.clone() {
            Some(existing) => match self.remote.update_event(target, &existing, &payload).await {
                Err(e) if e.is_not_found() => {
                    tracing::warn!(
                        "Remote event {} for local event {} is gone, recreating it",
                        existing,
                        event.id
                    );
                    event.remote_export_id = None;
                    self.store.save_event(event)?;
                    self.remote.create_event(target, &payload).await
                }
                other => other,
            },
            None => self.remote.create_event(target, &payload).await,
        };

        match written {
            Ok(remote) => {
                event.remote_export_id = Some(remote.id.clone());
                event.last_synced_at = Some(self.clock.now());
                self.store.save_event(event)?;
                tracing::info!("Exported event {} to {} as {}", event.id, target, remote.id);
                Ok(ExportOutcome::Written(remote.id))
            }
            Err(e) => {
                tracing::error!("Failed to export event {} to {}: {}", event.id, target, e);
                Ok(ExportOutcome::Failed)
            }
        }
    }

    /// Deletes the remote copy of `event` and forgets its export id. Returns
    /// false when the remote delete failed and the link was kept.
    pub async fn retract_event(&self, event: &mut Event, target: &str) -> Result<bool, SyncError> {
        let Some(remote_id) = event.remote_export_id.clone() else {
            return Ok(true);
        };

        if !self.delete_remote(target, &remote_id).await {
            return Ok(false);
        }

        event.remote_export_id = None;
        event.last_synced_at = None;
        self.store.save_event(event)?;
        tracing::info!("Retracted event {} from {}", event.id, target);
        Ok(true)
    }

    /// Deletes a remote event. A copy that is already gone counts as deleted.
    pub async fn delete_remote(&self, target: &str, remote_id: &str) -> bool {
        match self.remote.delete_event(target, remote_id).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => {
                tracing::debug!("Remote event {} was already deleted", remote_id);
                true
            }
            Err(e) => {
                tracing::error!("Failed to delete remote event {} from {}: {}", remote_id, target, e);
                false
            }
        }
    }

    /// Applies retractions and exports to every event of `calendar`.
    pub async fn export_calendar(&self, calendar: &Calendar, target: &str) -> Result<PassStats, SyncError> {
        let events = self.store.events_for_calendar(calendar.id)?;
        let mut stats = PassStats::default();

        tracing::info!("Exporting {} events of calendar {} to {}", events.len(), calendar.id, target);

        for mut event in events {
            let now = self.clock.now();

            if needs_retraction(&event, now) {
                match self.retract_event(&mut event, target).await {
                    Ok(true) => stats.removed += 1,
                    Ok(false) => stats.failed += 1,
                    Err(e) => {
                        tracing::error!("Failed to retract event {}: {}", event.id, e);
                        stats.failed += 1;
                    }
                }
                continue;
            }

            match self.export_event(&mut event, calendar, target).await {
                Ok(ExportOutcome::Written(_)) => stats.synced += 1,
                Ok(ExportOutcome::Unchanged(_)) | Ok(ExportOutcome::Skipped(_)) => stats.skipped += 1,
                Ok(ExportOutcome::Failed) => stats.failed += 1,
                Err(e) => {
                    tracing::error!("Failed to export event {}: {}", event.id, e);
                    stats.failed += 1;
                }
            }
        }

        tracing::info!(
            synced = stats.synced,
            removed = stats.removed,
            failed = stats.failed,
            "Export of calendar {} finished",
            calendar.id
        );
        Ok(stats)
    }
}
