use crate::components::schedule::Event;
use crate::utils::time::parse_rfc3339_in;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Private property marking entries written by this tool
pub const SOURCE_KEY: &str = "source";
pub const SOURCE_TAG: &str = "recwell-badminton";
/// Private property carrying the event uid
pub const UID_KEY: &str = "recwell_uid";
pub const EVENT_DESCRIPTION: &str = "Source: RecWell Badminton (auto-sync)";

/// Start or end of a calendar entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtendedProperties {
    #[serde(default)]
    pub private: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub shared: HashMap<String, String>,
}

/// Calendar entry as listed by the store
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    #[serde(default)]
    pub id: String,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
    pub extended_properties: Option<ExtendedProperties>,
}

impl CalendarEntry {
    /// Uid of an entry written by this tool, `None` for anything else
    pub fn managed_uid(&self) -> Option<&str> {
        let private = &self.extended_properties.as_ref()?.private;
        if private.get(SOURCE_KEY).map(String::as_str) != Some(SOURCE_TAG) {
            return None;
        }
        private.get(UID_KEY).map(String::as_str)
    }

    /// Timed start of the entry in `tz`
    pub fn start_in(&self, tz: Tz) -> Option<DateTime<Tz>> {
        let value = self.start.as_ref()?.date_time.as_deref()?;
        parse_rfc3339_in(value, tz)
    }
}

/// An entry carrying this tool's source tag and a uid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedCalendarEntry {
    pub uid: String,
    pub entry: CalendarEntry,
}

impl ManagedCalendarEntry {
    pub fn from_entry(entry: CalendarEntry) -> Option<Self> {
        let uid = entry.managed_uid()?.to_string();
        Some(Self { uid, entry })
    }

    /// Backend identifier used for update and delete
    pub fn id(&self) -> &str {
        &self.entry.id
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    #[serde(default)]
    pub items: Vec<CalendarEntry>,
    pub next_page_token: Option<String>,
}

/// Body sent on insert and update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub summary: String,
    pub location: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub description: String,
    pub extended_properties: ExtendedProperties,
}

impl EventBody {
    pub fn from_event(event: &Event) -> Self {
        let time_zone = event.start().timezone().name().to_string();

        let mut private = HashMap::new();
        private.insert(SOURCE_KEY.to_string(), SOURCE_TAG.to_string());
        private.insert(UID_KEY.to_string(), event.uid().to_string());

        Self {
            summary: event.title().to_string(),
            location: event.location().to_string(),
            start: EventDateTime {
                date_time: Some(event.start().to_rfc3339()),
                date: None,
                time_zone: Some(time_zone.clone()),
            },
            end: EventDateTime {
                date_time: Some(event.end().to_rfc3339()),
                date: None,
                time_zone: Some(time_zone),
            },
            description: EVENT_DESCRIPTION.to_string(),
            extended_properties: ExtendedProperties {
                private,
                shared: HashMap::new(),
            },
        }
    }

    pub fn uid(&self) -> Option<&str> {
        self.extended_properties.private.get(UID_KEY).map(String::as_str)
    }
}
