use super::models::{EventBody, EventPage, SOURCE_KEY, SOURCE_TAG};
use super::token::TokenProvider;
use crate::error::{store_error, SyncResult};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: &str = "250";

/// Calendar backend the reconciler writes to
#[async_trait]
pub trait EventStore: Send + Sync {
    /// One page of single (expanded) entries overlapping `[time_min, time_max)`,
    /// limited to entries carrying this tool's source tag
    async fn list_page(
        &self,
        calendar_id: &str,
        time_min: &DateTime<Tz>,
        time_max: &DateTime<Tz>,
        page_token: Option<&str>,
    ) -> SyncResult<EventPage>;

    async fn insert(&self, calendar_id: &str, body: &EventBody) -> SyncResult<()>;

    /// Replace the entry with backend id `entry_id`
    async fn update(&self, calendar_id: &str, entry_id: &str, body: &EventBody) -> SyncResult<()>;

    /// Remove an entry; one that is already gone counts as removed
    async fn delete(&self, calendar_id: &str, entry_id: &str) -> SyncResult<()>;
}

/// Google Calendar v3 over REST
#[derive(Debug)]
pub struct GoogleCalendarStore<T> {
    client: Client,
    tokens: T,
    base_url: String,
}

impl<T: TokenProvider> GoogleCalendarStore<T> {
    pub fn new(tokens: T, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| store_error(&format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            tokens,
            base_url: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Point the store at another API root
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// `.../calendars/{calendar_id}/events[/{entry_id}]` with each segment encoded
    fn events_url(&self, calendar_id: &str, entry_id: Option<&str>) -> SyncResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| store_error(&format!("Failed to parse URL: {}", e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| store_error("Calendar API URL cannot take a path"))?;
            segments.pop_if_empty().push("calendars").push(calendar_id).push("events");
            if let Some(entry_id) = entry_id {
                segments.push(entry_id);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> SyncResult<Response> {
        let access_token = self.tokens.access_token().await?;
        request
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| store_error(&format!("Failed to {}: {}", action, e)))
    }

    async fn check(response: Response, action: &str) -> SyncResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        Err(store_error(&format!(
            "Failed to {}: HTTP {} - {}",
            action, status, error_body
        )))
    }
}

#[async_trait]
impl<T: TokenProvider> EventStore for GoogleCalendarStore<T> {
    async fn list_page(
        &self,
        calendar_id: &str,
        time_min: &DateTime<Tz>,
        time_max: &DateTime<Tz>,
        page_token: Option<&str>,
    ) -> SyncResult<EventPage> {
        let mut url = self.events_url(calendar_id, None)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("timeMin", &time_min.to_rfc3339())
                .append_pair("timeMax", &time_max.to_rfc3339())
                .append_pair("singleEvents", "true")
                .append_pair("showDeleted", "false")
                .append_pair("maxResults", PAGE_SIZE)
                .append_pair(
                    "privateExtendedProperty",
                    &format!("{}={}", SOURCE_KEY, SOURCE_TAG),
                );
            if let Some(page_token) = page_token {
                query.append_pair("pageToken", page_token);
            }
        }

        let response = self.send(self.client.get(url), "list events").await?;
        let response = Self::check(response, "list events").await?;
        let page: EventPage = response
            .json()
            .await
            .map_err(|e| store_error(&format!("Failed to parse events response: {}", e)))?;

        debug!(
            "Listed {} entries (more pages: {})",
            page.items.len(),
            page.next_page_token.is_some()
        );
        Ok(page)
    }

    async fn insert(&self, calendar_id: &str, body: &EventBody) -> SyncResult<()> {
        let url = self.events_url(calendar_id, None)?;
        let response = self.send(self.client.post(url).json(body), "insert event").await?;
        Self::check(response, "insert event").await?;
        Ok(())
    }

    async fn update(&self, calendar_id: &str, entry_id: &str, body: &EventBody) -> SyncResult<()> {
        let url = self.events_url(calendar_id, Some(entry_id))?;
        let response = self.send(self.client.put(url).json(body), "update event").await?;
        Self::check(response, "update event").await?;
        Ok(())
    }

    async fn delete(&self, calendar_id: &str, entry_id: &str) -> SyncResult<()> {
        let url = self.events_url(calendar_id, Some(entry_id))?;
        let response = self.send(self.client.delete(url), "delete event").await?;

        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            warn!("Entry {} was already gone", entry_id);
            return Ok(());
        }
        Self::check(response, "delete event").await?;
        Ok(())
    }
}
