pub mod models;
pub mod reconcile;
pub mod store;
pub mod token;

pub use models::{CalendarEntry, EventBody, EventPage, ManagedCalendarEntry};
pub use reconcile::{reconcile, ReconcileReport};
pub use store::{EventStore, GoogleCalendarStore};
pub use token::{TokenManager, TokenProvider};
