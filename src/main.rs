use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gcal_sync::storage::SqliteStore;
use gcal_sync::storage::config::Config;
use gcal_sync::sync::{CalendarApi, GoogleAuthenticator, GoogleCalendarClient, SyncEngine};

mod cli;
use cli::{Cli, Command, format_calendars, format_previews, format_summary};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let config = match &cli.config {
        Some(path) => Config::load_from(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::load_or_create().context("loading configuration")?,
    };

    let store = SqliteStore::open(&config.storage.database)
        .with_context(|| format!("opening {}", config.storage.database.display()))?;
    let api = remote_client(&config).await;
    let mut engine = SyncEngine::new(&config, Box::new(store), api)?;

    match cli.command {
        Command::Sync {
            calendar_id,
            direction,
            dry_run: true,
        } => {
            let previews = engine.preview_sync(calendar_id, direction)?;
            println!("{}", format_previews(&previews));
        }
        Command::Sync {
            calendar_id,
            direction,
            dry_run: false,
        } => {
            let summary = engine.run_sync(calendar_id, direction).await;
            println!("{}", format_summary(&summary));
        }
        Command::Watch => {
            let minutes = u64::from(config.sync.auto_sync_interval_minutes.max(1));
            let mut interval = tokio::time::interval(Duration::from_secs(minutes * 60));
            tracing::info!("Watching, sync every {} minute(s)", minutes);

            loop {
                interval.tick().await;
                engine.set_api(remote_client(&config).await);
                let summary = engine.run_sync(None, None).await;
                println!("{}", format_summary(&summary));
            }
        }
        Command::Calendars => {
            let calendars = engine.list_remote_calendars().await?;
            println!("{}", format_calendars(&calendars));
        }
    }

    Ok(())
}

/// A client for the cached token, or none when sync is switched off or no
/// usable token exists.
async fn remote_client(config: &Config) -> Option<Arc<dyn CalendarApi>> {
    if !config.google.enabled {
        tracing::info!("Google sync is disabled in the configuration");
        return None;
    }

    match GoogleAuthenticator::new(&config.google).get_valid_token().await {
        Ok(token) => {
            let client: Arc<dyn CalendarApi> = Arc::new(GoogleCalendarClient::new(token.access_token));
            Some(client)
        }
        Err(e) => {
            tracing::error!("No usable access token: {}", e);
            eprintln!("Authentication error: {}", e);
            None
        }
    }
}

fn setup_logging() {
    let log_dir = Config::config_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "gcal-sync.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    std::mem::forget(_guard);

    tracing::info!("gcal-sync started");
}
