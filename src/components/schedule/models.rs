use crate::utils::time::{local_datetime, start_of_day};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the hex digest kept as an event uid
pub const UID_LENGTH: usize = 16;

/// A day section of a schedule document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    /// Heading text plus the first few body lines, used for date resolution
    pub header: String,
    pub lines: Vec<String>,
}

impl Block {
    pub fn new(header: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            header: header.into(),
            lines,
        }
    }
}

/// Maps a case-insensitive keyword found in schedule text to a venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRule {
    pub keyword: String,
    pub venue: String,
}

impl LocationRule {
    pub fn new(keyword: &str, venue: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            venue: venue.to_string(),
        }
    }
}

/// Built-in keyword table, most specific first
pub fn default_locations() -> Vec<LocationRule> {
    vec![
        LocationRule::new("field house", "RSF Field House, UC Berkeley"),
        LocationRule::new("fieldhouse", "RSF Field House, UC Berkeley"),
        LocationRule::new("rsf", "RSF, UC Berkeley"),
    ]
}

/// A synthesized schedule session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    title: String,
    location: String,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    uid: String,
}

impl Event {
    /// Build an event on `date` from wall-clock start and end times in `tz`.
    ///
    /// An end at or before the start is moved to the following day. Returns
    /// `None` when a wall-clock time does not exist in the zone.
    pub fn new(
        title: &str,
        location: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        tz: Tz,
    ) -> Option<Self> {
        let start_dt = local_datetime(tz, date.and_time(start))?;
        let mut end_dt = local_datetime(tz, date.and_time(end))?;
        if end_dt <= start_dt {
            end_dt = local_datetime(tz, (date + Duration::days(1)).and_time(end))?;
        }

        Some(Self::from_parts(title, location, start_dt, end_dt))
    }

    /// Build an event from already resolved instants
    pub fn from_parts(title: &str, location: &str, start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        let uid = compute_uid(&start, &end, location, title);
        Self {
            title: title.to_string(),
            location: location.to_string(),
            start,
            end,
            uid,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Format the event as a human-readable line
    pub fn format(&self) -> String {
        format!(
            "{} {}-{} {} @ {} [{}]",
            self.start.format("%a %Y-%m-%d"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
            self.title,
            self.location,
            self.uid
        )
    }
}

/// Content digest over (start, end, location, title)
pub fn compute_uid(start: &DateTime<Tz>, end: &DateTime<Tz>, location: &str, title: &str) -> String {
    let source = format!(
        "{}|{}|{}|{}",
        start.to_rfc3339(),
        end.to_rfc3339(),
        location,
        title
    );
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..UID_LENGTH].to_string()
}

/// Half-open range `[start, end)` anchored at local midnight of today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl Window {
    /// Window covering `days` calendar days starting on the local date of `now`;
    /// each bound is the first instant of its day
    pub fn from_now(now: DateTime<Tz>, days: u32) -> Option<Self> {
        let tz = now.timezone();
        let today = now.date_naive();
        let start = start_of_day(tz, today)?;
        let end = start_of_day(tz, today + Duration::days(i64::from(days)))?;
        Some(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    /// First date inside the window
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// First date after the window
    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start_date() <= date && date < self.end_date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_end_rolls_past_midnight() {
        let event = Event::new("Late", "Gym", date(2025, 11, 8), time(23, 0), time(1, 0), Los_Angeles).unwrap();
        assert_eq!(event.start().date_naive(), date(2025, 11, 8));
        assert_eq!(event.end().date_naive(), date(2025, 11, 9));
        assert!(event.end() > event.start());
    }

    #[test]
    fn test_equal_start_and_end_rolls_a_full_day() {
        let event = Event::new("All day", "Gym", date(2025, 11, 8), time(9, 0), time(9, 0), Los_Angeles).unwrap();
        assert_eq!(event.end() - event.start(), Duration::hours(24));
    }

    #[test]
    fn test_uid_is_stable_and_sensitive() {
        let a = Event::new("Badminton", "RSF", date(2025, 11, 9), time(12, 0), time(16, 0), Los_Angeles).unwrap();
        let b = Event::new("Badminton", "RSF", date(2025, 11, 9), time(12, 0), time(16, 0), Los_Angeles).unwrap();
        assert_eq!(a.uid(), b.uid());
        assert_eq!(a.uid().len(), UID_LENGTH);
        assert!(a.uid().chars().all(|c| c.is_ascii_hexdigit()));

        let moved = Event::new("Badminton", "Hearst", date(2025, 11, 9), time(12, 0), time(16, 0), Los_Angeles).unwrap();
        let renamed = Event::new("Open Rec", "RSF", date(2025, 11, 9), time(12, 0), time(16, 0), Los_Angeles).unwrap();
        let later = Event::new("Badminton", "RSF", date(2025, 11, 9), time(12, 30), time(16, 0), Los_Angeles).unwrap();
        assert_ne!(a.uid(), moved.uid());
        assert_ne!(a.uid(), renamed.uid());
        assert_ne!(a.uid(), later.uid());
    }

    #[test]
    fn test_nonexistent_local_time_is_rejected() {
        // 02:30 does not exist on the spring-forward date
        assert!(Event::new("x", "y", date(2025, 3, 9), time(2, 30), time(4, 0), Los_Angeles).is_none());
    }

    #[test]
    fn test_window_bounds() {
        let now = Los_Angeles.with_ymd_and_hms(2025, 11, 6, 15, 42, 0).unwrap();
        let window = Window::from_now(now, 7).unwrap();
        assert_eq!(window.start(), Los_Angeles.with_ymd_and_hms(2025, 11, 6, 0, 0, 0).unwrap());
        assert_eq!(window.end_date(), date(2025, 11, 13));
        assert!(window.contains_date(date(2025, 11, 6)));
        assert!(window.contains_date(date(2025, 11, 12)));
        assert!(!window.contains_date(date(2025, 11, 13)));
        assert!(!window.contains_date(date(2025, 11, 5)));
    }

    #[test]
    fn test_window_around_midnight_gap() {
        use chrono_tz::America::Santiago;

        // Clocks jump from 00:00 to 01:00 on 2024-09-08
        let window = Window::from_now(Santiago.with_ymd_and_hms(2024, 9, 7, 12, 0, 0).unwrap(), 1).unwrap();
        assert_eq!(window.end().to_rfc3339(), "2024-09-08T01:00:00-03:00");

        let window = Window::from_now(Santiago.with_ymd_and_hms(2024, 9, 8, 10, 0, 0).unwrap(), 7).unwrap();
        assert_eq!(window.start().to_rfc3339(), "2024-09-08T01:00:00-03:00");
        assert_eq!(window.start_date(), date(2024, 9, 8));
    }
}
