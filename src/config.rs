use crate::components::fetch::CacheBustMode;
use crate::components::schedule::models::{default_locations, LocationRule};
use crate::components::schedule::segment::ExtractionStrategy;
use crate::components::schedule::synth::SynthesisSettings;
use crate::error::{config_error, SyncResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::str::FromStr;

/// Default RecWell page listing the badminton schedule
pub const DEFAULT_SOURCE_URL: &str = "https://recwell.berkeley.edu/schedules-reservations/badminton/";
/// Default events widget carrying the same schedule as plain day blocks
pub const DEFAULT_WIDGET_URL: &str =
    "https://events.berkeley.edu/live/widget/15/tag/Open%20Rec%20Badminton";
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_TITLE: &str = "Badminton (RecWell)";
pub const DEFAULT_LOCATION: &str = "UC Berkeley RecWell";
pub const DEFAULT_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_TOKEN_PATH: &str = "token.json";
pub const CONFIG_FILE: &str = "config/recwell.toml";

/// Main configuration structure for a sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Google Calendar ID to keep in sync
    pub calendar_id: String,
    /// Google OAuth client ID (optional when the token file carries one)
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Path of the OAuth token file
    pub token_path: String,
    /// Page the HTML strategy reads
    pub source_url: String,
    /// Widget feed the text-feed and widget strategies read
    pub widget_url: String,
    /// How the fetched document is cut into day blocks
    pub strategy: ExtractionStrategy,
    /// IANA time zone the schedule is published in
    pub timezone: String,
    pub default_title: String,
    pub default_location: String,
    /// Size of the rolling window, in days, starting today
    pub window_days: u32,
    /// Print synthesized events instead of touching the calendar
    pub dry_run: bool,
    pub cache_bust: CacheBustMode,
    /// Look for widget links on the source page when nothing was found
    pub discovery: bool,
    /// Take bare hours without am/pm at face value instead of dropping them
    pub accept_ambiguous_times: bool,
    /// Per-request timeout for every network call
    pub request_timeout_secs: u64,
    /// Keyword to venue table used for location inference
    pub locations: Vec<LocationRule>,
}

/// Overrides read from `config/recwell.toml`
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    locations: Option<Vec<LocationRule>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendar_id: String::new(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            widget_url: DEFAULT_WIDGET_URL.to_string(),
            strategy: ExtractionStrategy::Widget,
            timezone: DEFAULT_TIMEZONE.to_string(),
            default_title: DEFAULT_TITLE.to_string(),
            default_location: DEFAULT_LOCATION.to_string(),
            window_days: DEFAULT_WINDOW_DAYS,
            dry_run: false,
            cache_bust: CacheBustMode::Daily,
            discovery: true,
            accept_ambiguous_times: false,
            request_timeout_secs: 30,
            locations: default_locations(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> SyncResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let file = match fs::read_to_string(CONFIG_FILE) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Self::from_sources(|key| env::var(key).ok(), file.as_deref())
    }

    /// Build a configuration from a variable lookup and optional TOML overrides
    pub fn from_sources<F>(lookup: F, file: Option<&str>) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dry_run = parse_flag(var("RECWELL_DRY_RUN"), "RECWELL_DRY_RUN", defaults.dry_run)?;

        let calendar_id = var("GOOGLE_CALENDAR_ID")
            .or_else(|| var("RECWELL_CALENDAR_ID"))
            .unwrap_or_default();
        if calendar_id.is_empty() && !dry_run {
            return Err(config_error(
                "GOOGLE_CALENDAR_ID (or RECWELL_CALENDAR_ID) must be set unless RECWELL_DRY_RUN is on",
            ));
        }

        let strategy = match var("RECWELL_STRATEGY") {
            Some(value) => ExtractionStrategy::from_str(&value)?,
            None => defaults.strategy,
        };

        let cache_bust = match var("RECWELL_CACHE_BUST") {
            Some(value) => CacheBustMode::from_str(&value)?,
            None => defaults.cache_bust,
        };

        let window_days = match var("RECWELL_WINDOW_DAYS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| config_error("Invalid RECWELL_WINDOW_DAYS format"))?,
            None => defaults.window_days,
        };

        let request_timeout_secs = match var("RECWELL_REQUEST_TIMEOUT") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| config_error("Invalid RECWELL_REQUEST_TIMEOUT format"))?,
            None => defaults.request_timeout_secs,
        };

        let mut locations = defaults.locations;
        if let Some(content) = file {
            let overrides: FileOverrides = toml::from_str(content)?;
            if let Some(file_locations) = overrides.locations {
                locations = file_locations;
            }
        }

        let config = Config {
            calendar_id,
            google_client_id: var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            token_path: var("GOOGLE_TOKEN_PATH").unwrap_or(defaults.token_path),
            source_url: var("RECWELL_SOURCE_URL").unwrap_or(defaults.source_url),
            widget_url: var("RECWELL_WIDGET_URL").unwrap_or(defaults.widget_url),
            strategy,
            timezone: var("TIMEZONE").unwrap_or(defaults.timezone),
            default_title: var("RECWELL_DEFAULT_TITLE").unwrap_or(defaults.default_title),
            default_location: var("RECWELL_DEFAULT_LOCATION").unwrap_or(defaults.default_location),
            window_days,
            dry_run,
            cache_bust,
            discovery: parse_flag(var("RECWELL_DISCOVERY"), "RECWELL_DISCOVERY", defaults.discovery)?,
            accept_ambiguous_times: parse_flag(
                var("RECWELL_ACCEPT_AMBIGUOUS_TIMES"),
                "RECWELL_ACCEPT_AMBIGUOUS_TIMES",
                defaults.accept_ambiguous_times,
            )?,
            request_timeout_secs,
            locations,
        };

        // Fail early on an unknown zone
        config.tz()?;

        Ok(config)
    }

    /// Parsed time zone
    pub fn tz(&self) -> SyncResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown time zone: {}", self.timezone)))
    }

    /// URL the configured strategy reads from
    pub fn document_url(&self) -> &str {
        match self.strategy {
            ExtractionStrategy::Html => &self.source_url,
            ExtractionStrategy::TextFeed | ExtractionStrategy::Widget => &self.widget_url,
        }
    }

    /// Settings handed to the event synthesizer
    pub fn synthesis_settings(&self) -> SyncResult<SynthesisSettings> {
        Ok(SynthesisSettings {
            tz: self.tz()?,
            default_title: self.default_title.clone(),
            default_location: self.default_location.clone(),
            locations: self.locations.clone(),
            accept_ambiguous_times: self.accept_ambiguous_times,
        })
    }
}

fn parse_flag(value: Option<String>, name: &str, default: bool) -> SyncResult<bool> {
    match value {
        None => Ok(default),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(config_error(&format!("Invalid {} value: {}", name, v))),
        },
    }
}
