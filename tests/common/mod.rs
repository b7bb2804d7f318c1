#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use chrono_tz::America::Los_Angeles;
use chrono_tz::Tz;
use recwell_sync::components::fetch::DocumentFetcher;
use recwell_sync::components::google_calendar::models::{
    CalendarEntry, EventBody, EventPage, ExtendedProperties, SOURCE_KEY, SOURCE_TAG, UID_KEY,
};
use recwell_sync::components::google_calendar::EventStore;
use recwell_sync::components::schedule::{Event, Window};
use recwell_sync::error::{fetch_error, store_error, SyncResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Thursday morning in Berkeley
pub fn now() -> DateTime<Tz> {
    Los_Angeles.with_ymd_and_hms(2025, 11, 6, 9, 0, 0).unwrap()
}

pub fn window() -> Window {
    Window::from_now(now(), 7).unwrap()
}

/// A noon to four session on `day` of November 2025
pub fn session(day: u32) -> Event {
    Event::from_parts(
        "Badminton (RecWell)",
        "UC Berkeley RecWell",
        Los_Angeles.with_ymd_and_hms(2025, 11, day, 12, 0, 0).unwrap(),
        Los_Angeles.with_ymd_and_hms(2025, 11, day, 16, 0, 0).unwrap(),
    )
}

/// Entry as the calendar would hold it after an insert of `body`
pub fn entry_from_body(id: &str, body: &EventBody) -> CalendarEntry {
    CalendarEntry {
        id: id.to_string(),
        summary: Some(body.summary.clone()),
        location: Some(body.location.clone()),
        description: Some(body.description.clone()),
        status: Some("confirmed".to_string()),
        start: Some(body.start.clone()),
        end: Some(body.end.clone()),
        extended_properties: Some(body.extended_properties.clone()),
    }
}

/// An entry some other tool (or a person) created
pub fn foreign_entry(id: &str, day: u32, source: Option<&str>) -> CalendarEntry {
    let mut body = EventBody::from_event(&session(day));
    body.summary = "Dentist".to_string();
    body.extended_properties = match source {
        Some(source) => {
            let mut private = HashMap::new();
            private.insert(SOURCE_KEY.to_string(), source.to_string());
            private.insert(UID_KEY.to_string(), "not-ours".to_string());
            ExtendedProperties {
                private,
                shared: HashMap::new(),
            }
        }
        None => ExtendedProperties::default(),
    };
    entry_from_body(id, &body)
}

/// Store call recorded by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(Option<String>),
    Insert(String),
    Update(String),
    Delete(String),
}

/// In-memory calendar honouring the tag filter, time bounds and paging
#[derive(Debug, Default)]
pub struct MockEventStore {
    entries: Mutex<BTreeMap<String, CalendarEntry>>,
    calls: Mutex<Vec<Call>>,
    next_id: Mutex<usize>,
    page_size: usize,
    fail_on: Option<&'static str>,
}

impl MockEventStore {
    pub fn new() -> Self {
        Self {
            page_size: 250,
            ..Default::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fail every call of `operation` ("list", "insert", "update" or "delete")
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    pub fn seed(&self, entry: CalendarEntry) {
        self.entries.lock().unwrap().insert(entry.id.clone(), entry);
    }

    pub fn entries(&self) -> Vec<CalendarEntry> {
        self.entries.lock().unwrap().values().cloned().collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| !matches!(call, Call::List(_)))
            .count()
    }

    pub fn managed_uids(&self) -> Vec<String> {
        let mut uids: Vec<String> = self
            .entries()
            .iter()
            .filter_map(|entry| entry.managed_uid().map(str::to_string))
            .collect();
        uids.sort();
        uids
    }

    fn check(&self, operation: &str) -> SyncResult<()> {
        match self.fail_on {
            Some(failing) if failing == operation => {
                Err(store_error(&format!("Failed to {} event: HTTP 500 - backend error", operation)))
            }
            _ => Ok(()),
        }
    }
}

fn starts_within(entry: &CalendarEntry, time_min: &DateTime<Tz>, time_max: &DateTime<Tz>) -> bool {
    entry
        .start
        .as_ref()
        .and_then(|start| start.date_time.as_deref())
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map_or(false, |start| start >= *time_min && start < *time_max)
}

#[async_trait]
impl EventStore for MockEventStore {
    async fn list_page(
        &self,
        _calendar_id: &str,
        time_min: &DateTime<Tz>,
        time_max: &DateTime<Tz>,
        page_token: Option<&str>,
    ) -> SyncResult<EventPage> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::List(page_token.map(str::to_string)));
        self.check("list")?;

        let tagged: Vec<CalendarEntry> = self
            .entries()
            .into_iter()
            .filter(|entry| {
                entry
                    .extended_properties
                    .as_ref()
                    .and_then(|props| props.private.get(SOURCE_KEY))
                    .map(String::as_str)
                    == Some(SOURCE_TAG)
            })
            .filter(|entry| starts_within(entry, time_min, time_max))
            .collect();

        let offset = page_token.map_or(0, |token| token.parse::<usize>().unwrap());
        let items: Vec<CalendarEntry> = tagged.iter().skip(offset).take(self.page_size).cloned().collect();
        let next = offset + items.len();
        Ok(EventPage {
            items,
            next_page_token: (next < tagged.len()).then(|| next.to_string()),
        })
    }

    async fn insert(&self, _calendar_id: &str, body: &EventBody) -> SyncResult<()> {
        let uid = body.uid().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(Call::Insert(uid));
        self.check("insert")?;

        let id = {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            format!("evt{:03}", *next_id)
        };
        self.seed(entry_from_body(&id, body));
        Ok(())
    }

    async fn update(&self, _calendar_id: &str, entry_id: &str, body: &EventBody) -> SyncResult<()> {
        self.calls.lock().unwrap().push(Call::Update(entry_id.to_string()));
        self.check("update")?;

        let mut entries = self.entries.lock().unwrap();
        if !entries.contains_key(entry_id) {
            return Err(store_error(&format!("Failed to update event: HTTP 404 - {}", entry_id)));
        }
        entries.insert(entry_id.to_string(), entry_from_body(entry_id, body));
        Ok(())
    }

    async fn delete(&self, _calendar_id: &str, entry_id: &str) -> SyncResult<()> {
        self.calls.lock().unwrap().push(Call::Delete(entry_id.to_string()));
        self.check("delete")?;

        self.entries.lock().unwrap().remove(entry_id);
        Ok(())
    }
}

/// Serves canned documents by URL; anything else is a 404
#[derive(Debug, Default)]
pub struct MockFetcher {
    documents: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, url: &str, body: &str) -> Self {
        self.documents.insert(url.to_string(), body.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> SyncResult<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| fetch_error(&format!("Failed to fetch {}: HTTP 404 Not Found", url)))
    }
}
