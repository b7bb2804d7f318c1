use crate::error::{config_error, fetch_error, Error, SyncResult};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Query parameter carrying the cache-busting token
pub const CACHE_BUST_PARAM: &str = "_cb";

const USER_AGENT: &str = concat!("recwell-sync/", env!("CARGO_PKG_VERSION"));

/// Retrieves a schedule document
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Body of `url`; any non-success status is an error
    async fn fetch(&self, url: &str) -> SyncResult<String>;
}

/// How the fetch URL is varied to get past intermediate caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheBustMode {
    Off,
    /// One token per local day
    Daily,
    /// A fresh token on every run
    PerRun,
}

impl CacheBustMode {
    pub fn token(self, now: DateTime<Tz>) -> Option<String> {
        match self {
            CacheBustMode::Off => None,
            CacheBustMode::Daily => Some(now.format("%Y%m%d").to_string()),
            CacheBustMode::PerRun => Some(now.timestamp().to_string()),
        }
    }
}

impl FromStr for CacheBustMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "false" => Ok(CacheBustMode::Off),
            "daily" | "date" => Ok(CacheBustMode::Daily),
            "per-run" | "timestamp" | "run" => Ok(CacheBustMode::PerRun),
            other => Err(config_error(&format!("Unknown cache bust mode: {}", other))),
        }
    }
}

/// `url` with the cache-busting parameter appended (or replaced)
pub fn cache_busted_url(url: &str, mode: CacheBustMode, now: DateTime<Tz>) -> SyncResult<Url> {
    let mut parsed =
        Url::parse(url).map_err(|e| fetch_error(&format!("Failed to parse URL {}: {}", url, e)))?;

    if let Some(token) = mode.token(now) {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| key != CACHE_BUST_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(CACHE_BUST_PARAM, &token);
    }

    Ok(parsed)
}

/// Fetches documents over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    cache_bust: CacheBustMode,
    now: DateTime<Tz>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, cache_bust: CacheBustMode, now: DateTime<Tz>) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| fetch_error(&format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cache_bust,
            now,
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> SyncResult<String> {
        let target = cache_busted_url(url, self.cache_bust, self.now)?;
        info!("Fetching schedule from {}", target);

        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(|e| fetch_error(&format!("Failed to fetch {}: {}", target, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(fetch_error(&format!("Failed to fetch {}: HTTP {}", target, status)));
        }

        response
            .text()
            .await
            .map_err(|e| fetch_error(&format!("Failed to read body of {}: {}", target, e)))
    }
}
