//! Cuts a fetched schedule document into day blocks.
//!
//! Three source layouts are supported, each behind [`Segmenter`]:
//!
//! - [`HtmlSegmenter`] for the RecWell page, where days are `h2`/`h3`
//!   headings or `.schedule-day`/`.day` containers;
//! - [`TextFeedSegmenter`] for plain text where a line such as
//!   `Sunday, Nov. 9` opens each day;
//! - [`WidgetSegmenter`] for the events widget, which groups days in
//!   `.lw_events_day` containers and otherwise reads like the text feed.

use super::models::Block;
use crate::error::{config_error, Error};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Body lines appended to a heading to form the block header
pub const HEADER_CONTEXT_LINES: usize = 3;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "main", "nav", "ol",
    "p", "section", "table", "tbody", "tfoot", "thead", "tr", "ul",
];
const SKIPPED_TAGS: &[&str] = &["head", "noscript", "script", "style", "template"];

lazy_static! {
    static ref MAIN: Selector = Selector::parse("main").expect("valid selector");
    static ref HTML_ANCHORS: Selector =
        Selector::parse("h2, h3, .schedule-day, .day").expect("valid selector");
    static ref DAY_CONTAINERS: Selector =
        Selector::parse(".lw_events_day, .schedule-day, .day").expect("valid selector");
    static ref CONTAINER_HEADINGS: Selector =
        Selector::parse(".lw_events_header, h2, h3, h4, h5").expect("valid selector");
    static ref CELLS: Selector = Selector::parse("td, th").expect("valid selector");
    static ref DAY_HEADING: Regex = Regex::new(
        r"(?i)^(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s*\d{1,2}(?:,?\s*\d{4})?$"
    )
    .expect("valid day heading pattern");
}

/// Produces candidate (header, lines) blocks from a raw document
pub trait Segmenter: Send + Sync {
    fn name(&self) -> &'static str;

    fn segment(&self, document: &str) -> Vec<Block>;
}

/// Which segmenter a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    Html,
    TextFeed,
    Widget,
}

impl ExtractionStrategy {
    pub fn segmenter(self) -> Box<dyn Segmenter> {
        match self {
            ExtractionStrategy::Html => Box::new(HtmlSegmenter),
            ExtractionStrategy::TextFeed => Box::new(TextFeedSegmenter),
            ExtractionStrategy::Widget => Box::new(WidgetSegmenter),
        }
    }
}

impl FromStr for ExtractionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(ExtractionStrategy::Html),
            "text-feed" | "text" | "feed" => Ok(ExtractionStrategy::TextFeed),
            "widget" => Ok(ExtractionStrategy::Widget),
            other => Err(config_error(&format!("Unknown extraction strategy: {}", other))),
        }
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStrategy::Html => write!(f, "html"),
            ExtractionStrategy::TextFeed => write!(f, "text-feed"),
            ExtractionStrategy::Widget => write!(f, "widget"),
        }
    }
}

/// Collapse runs of whitespace (including non-breaking spaces) to one space
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn build_header(heading: &str, lines: &[String]) -> String {
    let mut parts = Vec::with_capacity(HEADER_CONTEXT_LINES + 1);
    if !heading.is_empty() {
        parts.push(heading.to_string());
    }
    parts.extend(lines.iter().take(HEADER_CONTEXT_LINES).cloned());
    parts.join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn is_block(element: ElementRef<'_>) -> bool {
    BLOCK_TAGS.contains(&element.value().name())
}

fn has_block_descendant(element: ElementRef<'_>) -> bool {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(is_block)
}

fn push_line(lines: &mut Vec<String>, text: &str) {
    let line = normalize_whitespace(text);
    if !line.is_empty() {
        lines.push(line);
    }
}

/// Text lines of an element: leaf blocks whole, table rows as pipe-joined
/// cells, loose text nodes on their own.
pub fn collect_lines(element: ElementRef<'_>, lines: &mut Vec<String>) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }
    if name == "tr" {
        let cells: Vec<String> = element
            .select(&CELLS)
            .map(element_text)
            .filter(|cell| !cell.is_empty())
            .collect();
        if !cells.is_empty() {
            lines.push(cells.join(" | "));
        }
        return;
    }
    if !has_block_descendant(element) {
        push_line(lines, &element_text(element));
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_line(lines, text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_lines(child_element, lines);
                }
            }
            _ => {}
        }
    }
}

/// Segments the RecWell HTML page
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSegmenter;

impl HtmlSegmenter {
    /// Lines between a heading and the next day heading among its siblings
    fn section_lines(heading: ElementRef<'_>) -> Vec<String> {
        let mut lines = Vec::new();
        for sibling in heading.next_siblings() {
            match sibling.value() {
                Node::Text(text) => push_line(&mut lines, text),
                Node::Element(element) => {
                    if matches!(element.name(), "h2" | "h3") {
                        break;
                    }
                    if let Some(sibling_element) = ElementRef::wrap(sibling) {
                        collect_lines(sibling_element, &mut lines);
                    }
                }
                _ => {}
            }
        }
        lines
    }
}

impl Segmenter for HtmlSegmenter {
    fn name(&self) -> &'static str {
        "html"
    }

    fn segment(&self, document: &str) -> Vec<Block> {
        let html = Html::parse_document(document);
        let root = html.select(&MAIN).next().unwrap_or_else(|| html.root_element());

        let anchors: Vec<ElementRef<'_>> = root.select(&HTML_ANCHORS).collect();
        if anchors.is_empty() {
            let mut lines = Vec::new();
            collect_lines(root, &mut lines);
            return vec![Block::new(build_header("", &lines), lines)];
        }

        anchors
            .into_iter()
            .map(|anchor| {
                let is_heading = matches!(anchor.value().name(), "h2" | "h3");
                let (heading, mut lines) = if is_heading {
                    (element_text(anchor), Self::section_lines(anchor))
                } else {
                    let mut lines = Vec::new();
                    collect_lines(anchor, &mut lines);
                    (String::new(), lines)
                };

                // A heading wrapped on its own: read the enclosing container
                if is_heading && lines.is_empty() {
                    if let Some(parent) = anchor.parent().and_then(ElementRef::wrap) {
                        collect_lines(parent, &mut lines);
                        lines.retain(|line| *line != heading);
                    }
                }

                Block::new(build_header(&heading, &lines), lines)
            })
            .collect()
    }
}

/// Segments plain text where each day opens with a "Weekday, Month Day" line
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFeedSegmenter;

impl TextFeedSegmenter {
    pub fn is_day_heading(line: &str) -> bool {
        DAY_HEADING.is_match(line)
    }

    /// Segment already split lines; anything before the first heading is dropped
    pub fn segment_lines<I>(&self, lines: I) -> Vec<Block>
    where
        I: IntoIterator<Item = String>,
    {
        let mut blocks = Vec::new();
        let mut current: Option<(String, Vec<String>)> = None;

        for line in lines {
            let line = normalize_whitespace(&line);
            if line.is_empty() {
                continue;
            }
            if Self::is_day_heading(&line) {
                if let Some((heading, body)) = current.take() {
                    blocks.push(Block::new(build_header(&heading, &body), body));
                }
                current = Some((line, Vec::new()));
            } else if let Some((_, body)) = current.as_mut() {
                body.push(line);
            }
        }
        if let Some((heading, body)) = current {
            blocks.push(Block::new(build_header(&heading, &body), body));
        }

        blocks
    }
}

impl Segmenter for TextFeedSegmenter {
    fn name(&self) -> &'static str {
        "text-feed"
    }

    fn segment(&self, document: &str) -> Vec<Block> {
        self.segment_lines(document.lines().map(str::to_string))
    }
}

/// Segments the events widget output
#[derive(Debug, Clone, Copy, Default)]
pub struct WidgetSegmenter;

impl Segmenter for WidgetSegmenter {
    fn name(&self) -> &'static str {
        "widget"
    }

    fn segment(&self, document: &str) -> Vec<Block> {
        if !document.contains('<') {
            return TextFeedSegmenter.segment(document);
        }

        let html = Html::parse_document(document);
        let containers: Vec<ElementRef<'_>> = html.select(&DAY_CONTAINERS).collect();

        if containers.is_empty() {
            let mut lines = Vec::new();
            collect_lines(html.root_element(), &mut lines);
            return TextFeedSegmenter.segment_lines(lines);
        }

        containers
            .into_iter()
            .map(|container| {
                let heading = container
                    .select(&CONTAINER_HEADINGS)
                    .next()
                    .map(element_text)
                    .unwrap_or_default();
                let mut lines = Vec::new();
                collect_lines(container, &mut lines);
                lines.retain(|line| *line != heading);
                Block::new(build_header(&heading, &lines), lines)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "\
Open Rec Badminton

Sunday, Nov. 9
Time: Noon - 4 p.m.
Location: RSF FieldHouse Court C
Event: Open Rec Badminton

Mon, Nov 10
Time: 7 - 9 p.m.
Location: RSF Main Gym
";

    #[test]
    fn test_text_feed_blocks() {
        let blocks = TextFeedSegmenter.segment(FEED);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines.len(), 3);
        assert_eq!(blocks[0].lines[0], "Time: Noon - 4 p.m.");
        assert!(blocks[0].header.starts_with("Sunday, Nov. 9 Time: Noon - 4 p.m."));
        assert_eq!(blocks[1].lines, vec!["Time: 7 - 9 p.m.", "Location: RSF Main Gym"]);
    }

    #[test]
    fn test_day_heading_variants() {
        assert!(TextFeedSegmenter::is_day_heading("Sunday, Nov. 9"));
        assert!(TextFeedSegmenter::is_day_heading("Tuesday, November 11"));
        assert!(TextFeedSegmenter::is_day_heading("Wed Nov 12, 2025"));
        assert!(!TextFeedSegmenter::is_day_heading("Time: Noon - 4 p.m."));
        assert!(!TextFeedSegmenter::is_day_heading("Sunday fun day"));
    }

    #[test]
    fn test_html_headings_split_sections() {
        let page = r#"<html><head><title>Badminton</title></head><body>
            <main>
              <h2>Saturday, Nov. 8</h2>
              <ul><li>RSF Field House: 1 - 3 p.m.</li></ul>
              <h2>Sunday, Nov. 9</h2>
              <p>Time: <strong>Noon</strong> - 4 p.m.</p>
              <table><tr><td>Court 1</td><td>6 - 8 p.m.</td></tr></table>
            </main></body></html>"#;
        let blocks = HtmlSegmenter.segment(page);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines, vec!["RSF Field House: 1 - 3 p.m."]);
        assert!(blocks[0].header.starts_with("Saturday, Nov. 8"));
        assert_eq!(blocks[1].lines, vec!["Time: Noon - 4 p.m.", "Court 1 | 6 - 8 p.m."]);
    }

    #[test]
    fn test_html_without_anchors_uses_root() {
        let page = "<html><body><main><div>Friday 5 - 7 p.m.</div></main></body></html>";
        let blocks = HtmlSegmenter.segment(page);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec!["Friday 5 - 7 p.m."]);
        assert_eq!(blocks[0].header, "Friday 5 - 7 p.m.");
    }

    #[test]
    fn test_html_day_containers() {
        let page = r#"<main><div class="schedule-day"><span>Tue</span><div>6:30 - 9 pm</div></div></main>"#;
        let blocks = HtmlSegmenter.segment(page);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec!["Tue", "6:30 - 9 pm"]);
    }

    #[test]
    fn test_widget_day_containers() {
        let widget = r#"<div class="lw_widget_events">
            <div class="lw_events_day">
              <h4 class="lw_events_header">Sunday, Nov. 9</h4>
              <ul><li class="lw_event"><div>Time: Noon - 4 p.m.</div><div>Location: RSF FieldHouse</div></li></ul>
            </div>
            <div class="lw_events_day">
              <h4 class="lw_events_header">Monday, Nov. 10</h4>
              <ul><li class="lw_event"><div>Time: 7 - 9 p.m.</div></li></ul>
            </div></div>"#;
        let blocks = WidgetSegmenter.segment(widget);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines, vec!["Time: Noon - 4 p.m.", "Location: RSF FieldHouse"]);
        assert!(blocks[1].header.starts_with("Monday, Nov. 10"));
    }

    #[test]
    fn test_widget_falls_back_to_text_layout() {
        let widget = "<div><p>Sunday, Nov. 9</p><p>Time: Noon - 4 p.m.</p></div>";
        let blocks = WidgetSegmenter.segment(widget);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec!["Time: Noon - 4 p.m."]);

        assert_eq!(WidgetSegmenter.segment(FEED).len(), 2);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("HTML".parse::<ExtractionStrategy>().unwrap(), ExtractionStrategy::Html);
        assert_eq!("text-feed".parse::<ExtractionStrategy>().unwrap(), ExtractionStrategy::TextFeed);
        assert_eq!("widget".parse::<ExtractionStrategy>().unwrap(), ExtractionStrategy::Widget);
        assert!("pdf".parse::<ExtractionStrategy>().is_err());
        assert_eq!(ExtractionStrategy::TextFeed.segmenter().name(), "text-feed");
    }
}
