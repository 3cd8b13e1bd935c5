use std::path::PathBuf;

use clap::{Parser, Subcommand};

use gcal_sync::sync::{CalendarPreview, RemoteCalendar, SyncDirection, SyncSummary};

#[derive(Parser, Debug)]
#[command(name = "gcal-sync")]
#[command(about = "Synchronize local calendars with Google Calendar")]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run one sync pass
    Sync {
        /// Only sync this local calendar
        calendar_id: Option<i64>,

        /// Limit the pass to one direction
        #[arg(short, long, value_enum)]
        direction: Option<SyncDirection>,

        /// Show what would be exported without calling the remote API
        #[arg(long)]
        dry_run: bool,
    },
    /// Sync every `auto_sync_interval_minutes` until interrupted
    Watch,
    /// List the remote calendars available to the account
    Calendars,
}

pub fn format_summary(summary: &SyncSummary) -> String {
    format!("Synced {} event(s), {} error(s)", summary.synced, summary.errors)
}

pub fn format_previews(previews: &[CalendarPreview]) -> String {
    if previews.is_empty() {
        return "No calendars with sync enabled.".to_string();
    }

    let mut lines = Vec::new();
    for preview in previews {
        lines.push(format!("[{}] {}", preview.calendar_id, preview.title));
        if let Some(source) = &preview.import_from {
            lines.push(format!("  import from {}", source));
        }
        if let Some(target) = &preview.export_to {
            lines.push(format!(
                "  export to {}: {} to write, {} to retract",
                target, preview.would_export, preview.would_retract
            ));
            for (reason, count) in &preview.skipped {
                lines.push(format!("    skipped {:?}: {}", reason, count));
            }
        }
    }
    lines.join("\n")
}

pub fn format_calendars(calendars: &[RemoteCalendar]) -> String {
    if calendars.is_empty() {
        return "No remote calendars found.".to_string();
    }

    calendars
        .iter()
        .map(|c| {
            let marker = if c.primary { " (primary)" } else { "" };
            format!("{:<40} {}{}", c.id, c.summary, marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
