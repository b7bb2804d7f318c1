use crate::components::fetch::DocumentFetcher;
use crate::components::google_calendar::{reconcile, EventStore, ReconcileReport};
use crate::components::schedule::discovery::{discover_feed, Discovery};
use crate::components::schedule::segment::WidgetSegmenter;
use crate::components::schedule::{extract_events, Event, ExtractionStrategy, SynthesisSettings, Window};
use crate::config::Config;
use crate::error::{other_error, Error, SyncResult};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tracing::{info, warn};
use url::Url;

/// Result of one run
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub window: Window,
    pub events: Vec<Event>,
    /// `None` on a dry run
    pub report: Option<ReconcileReport>,
}

impl SyncSummary {
    pub fn synthesized(&self) -> usize {
        self.events.len()
    }
}

/// Outcome of the feed discovery fallback
#[derive(Debug)]
pub enum Enrichment {
    /// A feed was found and read
    Applied { url: Url, events: Vec<Event> },
    /// The source page was read and links no usable feed
    NoFeed,
    /// The source page could not be fetched
    SourceFailed(Error),
    /// The feed could not be fetched
    Failed { url: Url, error: Error },
}

/// Runs fetch, extraction and reconciliation in order
pub struct Orchestrator<'a> {
    config: &'a Config,
    fetcher: &'a dyn DocumentFetcher,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, fetcher: &'a dyn DocumentFetcher) -> Self {
        Self { config, fetcher }
    }

    /// Fetch the configured document and synthesize the events of the window
    /// starting at the local midnight of `now`.
    ///
    /// A failed fetch during feed discovery fails the run like the primary
    /// fetch does, so an unreachable feed never reads as an empty schedule.
    pub async fn collect_events(&self, now: DateTime<Tz>) -> SyncResult<(Window, Vec<Event>)> {
        let window = Window::from_now(now, self.config.window_days)
            .ok_or_else(|| other_error("Could not compute the sync window"))?;
        let settings = self.config.synthesis_settings()?;
        let today = now.date_naive();

        let document = self.fetcher.fetch(self.config.document_url()).await?;
        let segmenter = self.config.strategy.segmenter();
        let events = extract_events(&document, segmenter.as_ref(), today, &window, &settings);

        if !events.is_empty() || !self.config.discovery {
            return Ok((window, events));
        }

        let page = match self.config.strategy {
            ExtractionStrategy::Html => Some(document),
            _ => None,
        };
        let events = match self.enrich(page, today, &window, &settings).await {
            Enrichment::Applied { url, events } => {
                info!("Read {} events from discovered feed {}", events.len(), url);
                events
            }
            Enrichment::NoFeed => {
                info!("No schedule feed linked from {}", self.config.source_url);
                Vec::new()
            }
            Enrichment::SourceFailed(error) => {
                warn!("Source page could not be fetched for discovery: {}", error);
                return Err(error);
            }
            Enrichment::Failed { url, error } => {
                warn!("Discovered feed {} could not be read: {}", url, error);
                return Err(error);
            }
        };

        Ok((window, events))
    }

    /// Look for a widget or feed link on the source page and read it.
    ///
    /// `page` is the already fetched source page, if any.
    pub async fn enrich(
        &self,
        page: Option<String>,
        today: NaiveDate,
        window: &Window,
        settings: &SynthesisSettings,
    ) -> Enrichment {
        let page = match page {
            Some(page) => page,
            None => match self.fetcher.fetch(&self.config.source_url).await {
                Ok(page) => page,
                Err(error) => return Enrichment::SourceFailed(error),
            },
        };

        let url = match discover_feed(&page, &self.config.source_url) {
            Discovery::Found(url) => url,
            Discovery::NotFound => return Enrichment::NoFeed,
        };
        if url.as_str() == self.config.document_url() {
            return Enrichment::NoFeed;
        }

        match self.fetcher.fetch(url.as_str()).await {
            Ok(feed) => {
                let events = extract_events(&feed, &WidgetSegmenter, today, window, settings);
                Enrichment::Applied { url, events }
            }
            Err(error) => Enrichment::Failed { url, error },
        }
    }

    /// One full run. A dry run prints the events and leaves `store` untouched.
    pub async fn run<S>(&self, store: &S, now: DateTime<Tz>) -> SyncResult<SyncSummary>
    where
        S: EventStore + ?Sized,
    {
        let (window, events) = self.collect_events(now).await?;
        info!(
            "Synthesized {} events between {} and {}",
            events.len(),
            window.start_date(),
            window.end_date()
        );

        if self.config.dry_run {
            for event in &events {
                println!("{}", event.format());
            }
            return Ok(SyncSummary {
                window,
                events,
                report: None,
            });
        }

        let report = reconcile(store, &self.config.calendar_id, &window, &events).await?;

        Ok(SyncSummary {
            window,
            events,
            report: Some(report),
        })
    }
}
