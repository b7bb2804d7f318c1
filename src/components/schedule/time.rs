//! Clock expressions such as "Noon", "2:30" or "4 p.m." resolved to 24-hour times.

use chrono::NaiveTime;
use thiserror::Error;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse-local failure for a single clock token
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("malformed time token: {0}")]
    Malformed(String),
    #[error("time out of range: {0}")]
    OutOfRange(String),
    #[error("ambiguous time without am/pm: {0}")]
    Ambiguous(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    /// Parse "am", "p.m.", "P M" and similar spellings
    pub fn parse(token: &str) -> Option<Self> {
        let normalized: String = token
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "am" => Some(Meridiem::Am),
            "pm" => Some(Meridiem::Pm),
            _ => None,
        }
    }

    fn opposite(self) -> Self {
        match self {
            Meridiem::Am => Meridiem::Pm,
            Meridiem::Pm => Meridiem::Am,
        }
    }
}

/// A resolved start/end pair, both wall-clock times on the same nominal day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// "noon" and "midnight" carry their own meridiem
pub fn is_anchor_word(raw: &str) -> bool {
    let word = raw.trim();
    word.eq_ignore_ascii_case("noon") || word.eq_ignore_ascii_case("midnight")
}

/// Resolve a clock token to `(hour, minute)` on a 24-hour clock.
///
/// Without a hint the hour is returned as written.
pub fn resolve_time(raw: &str, hint: Option<Meridiem>) -> Result<(u32, u32), TimeParseError> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("noon") {
        return Ok((12, 0));
    }
    if value.eq_ignore_ascii_case("midnight") {
        return Ok((0, 0));
    }

    let (hour_str, minute_str) = match value.split_once(':') {
        Some((h, m)) => (h, m),
        None => (value, "00"),
    };
    let hour = hour_str
        .parse::<u32>()
        .map_err(|_| TimeParseError::Malformed(raw.to_string()))?;
    let minute = minute_str
        .parse::<u32>()
        .map_err(|_| TimeParseError::Malformed(raw.to_string()))?;
    if hour > 23 || minute > 59 {
        return Err(TimeParseError::OutOfRange(raw.to_string()));
    }

    let hour = match hint {
        Some(Meridiem::Pm) if hour < 12 => hour + 12,
        Some(Meridiem::Am) if hour == 12 => 0,
        _ => hour,
    };

    Ok((hour, minute))
}

/// Resolve both ends of a range, sharing a meridiem written on one side only.
///
/// The side without a meridiem borrows the other side's, unless the opposite
/// meridiem yields a shorter span ("11 - 1 p.m." is read as 11:00-13:00).
/// This is a heuristic over how schedules are usually written, not a rule.
/// After borrowing, a bare hour between 1 and 12 is ambiguous and rejected
/// unless `accept_ambiguous` is set.
pub fn resolve_range(
    start_raw: &str,
    start_hint: Option<Meridiem>,
    end_raw: &str,
    end_hint: Option<Meridiem>,
    accept_ambiguous: bool,
) -> Result<TimeRange, TimeParseError> {
    let (start, end) = match (start_hint, end_hint) {
        (None, Some(hint)) if !is_anchor_word(start_raw) => {
            let end = resolve_time(end_raw, end_hint)?;
            let start = shortest_reading(start_raw, hint, |candidate| span(candidate, end))?;
            (start, end)
        }
        (Some(hint), None) if !is_anchor_word(end_raw) => {
            let start = resolve_time(start_raw, start_hint)?;
            let end = shortest_reading(end_raw, hint, |candidate| span(start, candidate))?;
            (start, end)
        }
        _ => {
            if !accept_ambiguous {
                check_unambiguous(start_raw, start_hint)?;
                check_unambiguous(end_raw, end_hint)?;
            }
            (resolve_time(start_raw, start_hint)?, resolve_time(end_raw, end_hint)?)
        }
    };

    Ok(TimeRange {
        start: to_naive(start, start_raw)?,
        end: to_naive(end, end_raw)?,
    })
}

fn shortest_reading<F>(raw: &str, hint: Meridiem, span_of: F) -> Result<(u32, u32), TimeParseError>
where
    F: Fn((u32, u32)) -> u32,
{
    let inherited = resolve_time(raw, Some(hint))?;
    let opposite = resolve_time(raw, Some(hint.opposite()))?;
    if span_of(opposite) < span_of(inherited) {
        Ok(opposite)
    } else {
        Ok(inherited)
    }
}

fn check_unambiguous(raw: &str, hint: Option<Meridiem>) -> Result<(), TimeParseError> {
    if hint.is_some() || is_anchor_word(raw) {
        return Ok(());
    }
    let (hour, _) = resolve_time(raw, None)?;
    if (1..=12).contains(&hour) {
        return Err(TimeParseError::Ambiguous(raw.to_string()));
    }
    Ok(())
}

/// Minutes from start to end, an end at or before the start meaning the next day
fn span(start: (u32, u32), end: (u32, u32)) -> u32 {
    let start = start.0 * 60 + start.1;
    let end = end.0 * 60 + end.1;
    let diff = (end + MINUTES_PER_DAY - start) % MINUTES_PER_DAY;
    if diff == 0 {
        MINUTES_PER_DAY
    } else {
        diff
    }
}

fn to_naive((hour, minute): (u32, u32), raw: &str) -> Result<NaiveTime, TimeParseError> {
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| TimeParseError::OutOfRange(raw.to_string()))
}
