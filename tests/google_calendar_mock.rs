mod common;

use common::{foreign_entry, session, window, Call, MockEventStore};
use recwell_sync::components::google_calendar::{reconcile, EventBody, EventStore, ReconcileReport};
use recwell_sync::components::schedule::Event;

const CALENDAR: &str = "badminton@group.calendar.google.com";

/// Seed the store with the entries a previous run would have written
async fn seeded(events: &[Event]) -> MockEventStore {
    let store = MockEventStore::new();
    for event in events {
        store.insert(CALENDAR, &EventBody::from_event(event)).await.unwrap();
    }
    store
}

#[tokio::test]
async fn test_inserts_updates_and_deletes() {
    // Existing: the 8th (still wanted) and the 7th (dropped from the schedule)
    let store = seeded(&[session(8), session(7)]).await;
    let desired = vec![session(8), session(9), session(10)];

    let report = reconcile(&store, CALENDAR, &window(), &desired).await.unwrap();

    assert_eq!(
        report,
        ReconcileReport {
            inserted: 2,
            updated: 1,
            deleted: 1
        }
    );
    let mut expected: Vec<String> = desired.iter().map(|e| e.uid().to_string()).collect();
    expected.sort();
    assert_eq!(store.managed_uids(), expected);
}

#[tokio::test]
async fn test_second_run_only_updates() {
    let store = MockEventStore::new();
    let desired = vec![session(8), session(9)];

    let first = reconcile(&store, CALENDAR, &window(), &desired).await.unwrap();
    assert_eq!(first.inserted, 2);

    let second = reconcile(&store, CALENDAR, &window(), &desired).await.unwrap();
    assert_eq!(
        second,
        ReconcileReport {
            inserted: 0,
            updated: 2,
            deleted: 0
        }
    );
    assert_eq!(store.entries().len(), 2);
}

#[tokio::test]
async fn test_empty_schedule_clears_managed_entries_only() {
    let store = seeded(&[session(8), session(9)]).await;
    store.seed(foreign_entry("personal", 8, None));
    store.seed(foreign_entry("other-tool", 9, Some("someone-else")));

    let report = reconcile(&store, CALENDAR, &window(), &[]).await.unwrap();

    assert_eq!(report.deleted, 2);
    assert_eq!(report.inserted + report.updated, 0);
    let ids: Vec<String> = store.entries().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["other-tool", "personal"]);
}

#[tokio::test]
async fn test_entries_outside_window_are_left_alone() {
    // The 20th is past the seven day window
    let store = seeded(&[session(20)]).await;

    let report = reconcile(&store, CALENDAR, &window(), &[session(8)]).await.unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(store.entries().len(), 2);
}

#[tokio::test]
async fn test_all_pages_are_read() {
    let store = MockEventStore::new().with_page_size(2);
    let all: Vec<_> = (6..=12).map(session).collect();
    for event in &all {
        store.insert(CALENDAR, &EventBody::from_event(event)).await.unwrap();
    }

    let report = reconcile(&store, CALENDAR, &window(), &all).await.unwrap();

    // Every existing entry was found, so nothing is re-inserted
    assert_eq!(report.updated, 7);
    assert_eq!(report.inserted, 0);
    let lists: Vec<Call> = store
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::List(_)))
        .collect();
    assert_eq!(
        lists,
        vec![
            Call::List(None),
            Call::List(Some("2".to_string())),
            Call::List(Some("4".to_string())),
            Call::List(Some("6".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_list_failure_aborts_before_mutations() {
    let store = MockEventStore::new().failing_on("list");

    let err = reconcile(&store, CALENDAR, &window(), &[session(8)]).await.unwrap_err();

    assert_eq!(err.stage(), "store");
    assert_eq!(store.mutations(), 0);
}

#[tokio::test]
async fn test_insert_failure_stops_the_run() {
    let store = MockEventStore::new().failing_on("insert");

    let err = reconcile(&store, CALENDAR, &window(), &[session(8), session(9)])
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "store");
    // The first failing call is the last one made
    assert_eq!(store.mutations(), 1);
    assert!(store.entries().is_empty());
}

#[tokio::test]
async fn test_changed_session_replaces_old_entry() {
    let store = seeded(&[session(9)]).await;
    let moved = Event::from_parts(
        "Badminton (RecWell)",
        "RSF Field House, UC Berkeley",
        session(9).start(),
        session(9).end(),
    );

    let report = reconcile(&store, CALENDAR, &window(), &[moved.clone()]).await.unwrap();

    assert_eq!((report.inserted, report.deleted), (1, 1));
    assert_eq!(store.managed_uids(), vec![moved.uid().to_string()]);
    assert_eq!(
        store.entries()[0].location.as_deref(),
        Some("RSF Field House, UC Berkeley")
    );
}
