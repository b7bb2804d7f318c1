// Export components
pub mod fetch;
pub mod google_calendar;
pub mod schedule;

pub use fetch::{DocumentFetcher, HttpFetcher};
