use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Resolve a wall-clock time in `tz`.
///
/// Ambiguous times (DST fold) take the earlier instant; times inside a DST
/// gap do not exist and yield `None`.
pub fn local_datetime(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest()
}

/// First instant of `date` in `tz`: local midnight, or the end of a DST gap
/// starting at midnight
pub fn start_of_day(tz: Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    (0..24 * 60)
        .map(|minutes| midnight + Duration::minutes(minutes))
        .take_while(|naive| naive.date() == date)
        .find_map(|naive| local_datetime(tz, naive))
}

/// Current time in `tz`
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Parse an RFC 3339 timestamp into `tz`
pub fn parse_rfc3339_in(value: &str, tz: Tz) -> Option<DateTime<Tz>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&tz))
}
