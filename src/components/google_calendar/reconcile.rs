use super::models::{CalendarEntry, EventBody, ManagedCalendarEntry};
use super::store::EventStore;
use crate::components::schedule::{Event, Window};
use crate::error::SyncResult;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Counts of applied mutations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl ReconcileReport {
    pub fn applied(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Every entry the store lists for `window`, across all pages
pub async fn list_window<S>(
    store: &S,
    calendar_id: &str,
    window: &Window,
) -> SyncResult<Vec<CalendarEntry>>
where
    S: EventStore + ?Sized,
{
    let (time_min, time_max) = (window.start(), window.end());
    let mut entries = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = store
            .list_page(calendar_id, &time_min, &time_max, page_token.as_deref())
            .await?;
        entries.extend(page.items);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    Ok(entries)
}

/// Managed entries keyed by uid, plus any later entries repeating a uid
pub fn index_managed(
    entries: Vec<CalendarEntry>,
) -> (BTreeMap<String, ManagedCalendarEntry>, Vec<ManagedCalendarEntry>) {
    let mut by_uid = BTreeMap::new();
    let mut duplicates = Vec::new();

    for managed in entries.into_iter().filter_map(ManagedCalendarEntry::from_entry) {
        if by_uid.contains_key(&managed.uid) {
            duplicates.push(managed);
        } else {
            by_uid.insert(managed.uid.clone(), managed);
        }
    }

    (by_uid, duplicates)
}

/// Make the managed entries of `calendar_id` inside `window` match `desired`.
///
/// Desired events whose uid already exists are updated in place, new ones are
/// inserted, and managed entries with no desired counterpart are deleted.
/// Entries without this tool's tag are never touched. The first failing store
/// call aborts the run; mutations already applied stay applied.
pub async fn reconcile<S>(
    store: &S,
    calendar_id: &str,
    window: &Window,
    desired: &[Event],
) -> SyncResult<ReconcileReport>
where
    S: EventStore + ?Sized,
{
    let entries = list_window(store, calendar_id, window).await?;
    let listed = entries.len();
    let (mut existing, duplicates) = index_managed(entries);
    info!(
        "Found {} managed entries ({} listed) between {} and {}",
        existing.len(),
        listed,
        window.start(),
        window.end()
    );

    let mut report = ReconcileReport::default();

    for duplicate in duplicates {
        info!("Deleting duplicate entry {} for uid {}", duplicate.id(), duplicate.uid);
        store.delete(calendar_id, duplicate.id()).await?;
        report.deleted += 1;
    }

    let mut seen = HashSet::new();
    for event in desired {
        if !seen.insert(event.uid()) {
            continue;
        }

        let body = EventBody::from_event(event);
        match existing.remove(event.uid()) {
            Some(current) => {
                info!("Updating {} ({})", event.format(), current.id());
                store.update(calendar_id, current.id(), &body).await?;
                report.updated += 1;
            }
            None => {
                info!("Inserting {}", event.format());
                store.insert(calendar_id, &body).await?;
                report.inserted += 1;
            }
        }
    }

    let tz = window.start().timezone();
    for stale in existing.values() {
        match stale.entry.start_in(tz) {
            Some(start) => info!("Deleting stale entry {} starting {}", stale.id(), start),
            None => info!("Deleting stale entry {} for uid {}", stale.id(), stale.uid),
        }
        store.delete(calendar_id, stale.id()).await?;
        report.deleted += 1;
    }

    info!(
        "Reconciled calendar: {} inserted, {} updated, {} deleted",
        report.inserted, report.updated, report.deleted
    );
    Ok(report)
}
