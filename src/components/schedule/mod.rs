pub mod day;
pub mod discovery;
pub mod models;
pub mod segment;
pub mod synth;
pub mod time;

pub use models::{Block, Event, Window};
pub use segment::{ExtractionStrategy, Segmenter};
pub use synth::SynthesisSettings;

use chrono::NaiveDate;
use tracing::info;

/// Segment `document` with `segmenter` and synthesize the deduplicated events
pub fn extract_events(
    document: &str,
    segmenter: &dyn Segmenter,
    today: NaiveDate,
    window: &Window,
    settings: &SynthesisSettings,
) -> Vec<Event> {
    let blocks = segmenter.segment(document);
    let events = synth::synthesize_all(&blocks, today, window, settings);
    info!(
        "{} segmenter found {} blocks and {} events",
        segmenter.name(),
        blocks.len(),
        events.len()
    );
    events
}
