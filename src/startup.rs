use crate::components::fetch::HttpFetcher;
use crate::components::google_calendar::{GoogleCalendarStore, TokenManager};
use crate::config::Config;
use crate::error::Error;
use crate::sync::{Orchestrator, SyncSummary};
use crate::utils::time::now_in;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Run one sync against the live schedule and calendar
pub async fn run(config: Config) -> miette::Result<SyncSummary> {
    let tz = config.tz()?;
    let now = now_in(tz);
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let fetcher = HttpFetcher::new(timeout, config.cache_bust, now)?;
    // The token file is only read once the store is first used
    let tokens = TokenManager::new(&config)?;
    let store = GoogleCalendarStore::new(tokens, timeout)?;

    let orchestrator = Orchestrator::new(&config, &fetcher);
    match orchestrator.run(&store, now).await {
        Ok(summary) => {
            match &summary.report {
                Some(report) => info!(
                    "Sync complete: {} events, {} inserted, {} updated, {} deleted",
                    summary.synthesized(),
                    report.inserted,
                    report.updated,
                    report.deleted
                ),
                None => info!("Dry run complete: {} events", summary.synthesized()),
            }
            Ok(summary)
        }
        Err(e) => {
            error!("Sync failed during {} stage: {}", e.stage(), e);
            Err(e.into())
        }
    }
}
