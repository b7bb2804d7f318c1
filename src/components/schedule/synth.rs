use super::day::{next_weekday, resolve_date, weekday_in};
use super::models::{Block, Event, LocationRule, Window};
use super::time::{resolve_range, Meridiem};
use chrono::NaiveDate;
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashSet;
use tracing::debug;

lazy_static! {
    static ref TIME_RANGE: Regex = Regex::new(
        r"(?i)\b(?P<s>\d{1,2}(?::\d{2})?|noon|midnight)\s*(?P<samp>a\.?\s?m\b\.?|p\.?\s?m\b\.?)?\s*(?:[-–—]|\bto\b)\s*(?P<e>\d{1,2}(?::\d{2})?|noon|midnight)\s*(?P<eamp>a\.?\s?m\b\.?|p\.?\s?m\b\.?)?"
    )
    .expect("valid time range pattern");
    static ref LABELED_TITLE: Regex =
        Regex::new(r"(?i)^\s*(?:event|title|activity)\s*:\s*(.+?)\s*$").expect("valid title pattern");
}

/// Everything the synthesizer needs besides the document itself
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub tz: Tz,
    pub default_title: String,
    pub default_location: String,
    pub locations: Vec<LocationRule>,
    pub accept_ambiguous_times: bool,
}

/// Whether a line carries a time range
pub fn has_time_range(line: &str) -> bool {
    TIME_RANGE.is_match(line)
}

/// Venue for the first keyword contained in `text`
pub fn infer_location<'a>(text: &str, rules: &'a [LocationRule], default: &'a str) -> &'a str {
    let lower = text.to_lowercase();
    rules
        .iter()
        .find(|rule| lower.contains(&rule.keyword.to_lowercase()))
        .map(|rule| rule.venue.as_str())
        .unwrap_or(default)
}

/// Value of the first `Event:`/`Title:`/`Activity:` line
pub fn labeled_title<'a, I>(lines: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    lines.into_iter().find_map(|line| {
        LABELED_TITLE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|title| !title.is_empty())
    })
}

fn meridiem(caps: &Captures<'_>, name: &str) -> Option<Meridiem> {
    caps.name(name).and_then(|m| Meridiem::parse(m.as_str()))
}

/// The time-bearing line at `index` and the lines describing it, up to the
/// next time-bearing line
fn record_context(lines: &[String], index: usize) -> &[String] {
    let end = lines[index + 1..]
        .iter()
        .position(|line| has_time_range(line))
        .map(|offset| index + 1 + offset)
        .unwrap_or(lines.len());
    &lines[index..end]
}

/// Build one event from a schedule line, or `None` when the line does not
/// describe a session inside the window
fn event_from_line(
    lines: &[String],
    index: usize,
    header_date: Option<NaiveDate>,
    today: NaiveDate,
    window: &Window,
    settings: &SynthesisSettings,
) -> Option<Event> {
    let line = &lines[index];
    let caps = TIME_RANGE.captures(line)?;

    let date = match header_date.or_else(|| weekday_in(line).map(|w| next_weekday(w, today))) {
        Some(date) => date,
        None => {
            debug!("Discarding line without a resolvable date: {}", line);
            return None;
        }
    };
    if !window.contains_date(date) {
        debug!("Discarding line dated {} outside the window: {}", date, line);
        return None;
    }

    let range = match resolve_range(
        &caps["s"],
        meridiem(&caps, "samp"),
        &caps["e"],
        meridiem(&caps, "eamp"),
        settings.accept_ambiguous_times,
    ) {
        Ok(range) => range,
        Err(e) => {
            debug!("Discarding line with unusable time ({}): {}", e, line);
            return None;
        }
    };

    let context = record_context(lines, index);
    let location = infer_location(&context.join(" "), &settings.locations, &settings.default_location);
    let title = labeled_title(context).unwrap_or_else(|| settings.default_title.clone());

    let event = Event::new(&title, location, date, range.start, range.end, settings.tz);
    if event.is_none() {
        debug!("Discarding line whose time does not exist in {}: {}", settings.tz, line);
    }
    event
}

/// Events described by one block, in line order.
///
/// The date comes from an explicit date in the header, else a weekday in the
/// header, else a weekday in the line itself.
pub fn synthesize<'a>(
    block: &'a Block,
    today: NaiveDate,
    window: &'a Window,
    settings: &'a SynthesisSettings,
) -> impl Iterator<Item = Event> + 'a {
    let header_date = resolve_date(&block.header, today);

    (0..block.lines.len()).filter_map(move |index| {
        event_from_line(&block.lines, index, header_date, today, window, settings)
    })
}

/// Events across all blocks, deduplicated by uid in first-seen order
pub fn synthesize_all(
    blocks: &[Block],
    today: NaiveDate,
    window: &Window,
    settings: &SynthesisSettings,
) -> Vec<Event> {
    let mut seen = HashSet::new();
    blocks
        .iter()
        .flat_map(|block| synthesize(block, today, window, settings))
        .filter(|event| seen.insert(event.uid().to_string()))
        .collect()
}
