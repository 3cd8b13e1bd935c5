use clap::ValueEnum;

use crate::calendar::Calendar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SyncDirection {
    Import,
    Export,
    #[default]
    Both,
}

impl SyncDirection {
    pub fn includes_import(self) -> bool {
        matches!(self, SyncDirection::Import | SyncDirection::Both)
    }

    pub fn includes_export(self) -> bool {
        matches!(self, SyncDirection::Export | SyncDirection::Both)
    }
}

/// The remote calendars a local calendar syncs with, per direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncPlan {
    pub import: Option<String>,
    pub export: Option<String>,
}

impl SyncPlan {
    pub fn resolve(calendar: &Calendar) -> Self {
        if !calendar.sync_enabled {
            return Self::default();
        }

        Self {
            import: non_empty(calendar.import_calendar.as_deref()),
            export: non_empty(calendar.export_calendar.as_deref()),
        }
    }

    pub fn restrict(self, direction: SyncDirection) -> Self {
        Self {
            import: self.import.filter(|_| direction.includes_import()),
            export: self.export.filter(|_| direction.includes_export()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.import.is_none() && self.export.is_none()
    }

    /// Both directions point at one remote calendar, so loop prevention is
    /// what keeps imports from bouncing back.
    pub fn shares_remote_calendar(&self) -> bool {
        matches!((&self.import, &self.export), (Some(i), Some(e)) if i == e)
    }

    /// Export target for imported events, when it differs from the source.
    pub fn cross_export_target(&self) -> Option<&str> {
        match (&self.import, &self.export) {
            (Some(i), Some(e)) if i != e => Some(e),
            _ => None,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
