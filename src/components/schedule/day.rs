//! Resolves day headers ("Sunday, Nov. 9", "11/10", "Tue") to calendar dates.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use lazy_static::lazy_static;
use regex::Regex;

/// How far in the past an explicit date may be before it is read as next year's
const YEAR_ROLLOVER_DAYS: i64 = 7;

lazy_static! {
    static ref MONTH_DAY: Regex = Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{1,2})\b"
    )
    .expect("valid month/day pattern");
    static ref NUMERIC_DATE: Regex =
        Regex::new(r"\b(\d{1,2})/(\d{1,2})\b").expect("valid numeric date pattern");
    static ref WEEKDAY: Regex = Regex::new(
        r"(?i)\b(monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thur|thu|friday|fri|saturday|sat|sunday|sun)\b\.?"
    )
    .expect("valid weekday pattern");
}

/// Month number for a full or abbreviated English month name
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim_end_matches('.').to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let lower = name.to_ascii_lowercase();
    let weekday = match lower.get(..3)? {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

/// Date for `month`/`day` in the reference year, or next year when it lies
/// more than a week behind `today`.
pub fn date_near(month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if date < today - Duration::days(YEAR_ROLLOVER_DAYS) {
        return NaiveDate::from_ymd_opt(today.year() + 1, month, day);
    }
    Some(date)
}

/// First explicit month/day in `text` that forms a real date
pub fn explicit_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let named = MONTH_DAY.captures_iter(text).find_map(|caps| {
        let month = month_number(caps.get(1)?.as_str())?;
        let day = caps.get(2)?.as_str().parse::<u32>().ok()?;
        date_near(month, day, today)
    });
    if named.is_some() {
        return named;
    }

    NUMERIC_DATE.captures_iter(text).find_map(|caps| {
        let month = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let day = caps.get(2)?.as_str().parse::<u32>().ok()?;
        date_near(month, day, today)
    })
}

/// First weekday name or abbreviation in `text`
pub fn weekday_in(text: &str) -> Option<Weekday> {
    WEEKDAY
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| weekday_from_name(m.as_str()))
}

/// Nearest date on or after `today` falling on `weekday`
pub fn next_weekday(weekday: Weekday, today: NaiveDate) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;
    today + Duration::days(ahead)
}

/// Resolve a header to a date: explicit month/day first, then a weekday name
pub fn resolve_date(header: &str, today: NaiveDate) -> Option<NaiveDate> {
    explicit_date(header, today).or_else(|| weekday_in(header).map(|w| next_weekday(w, today)))
}
