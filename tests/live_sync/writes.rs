//! Admin writes routed through the store and echoed over the channel.

use serde_json::json;
use shelf_sync::models::{Announcement, Reservation, ReservationLocal, ReservationStatus};
use shelf_sync::{
    EmitterChannel, EventNames, InMemorySource, LiveCollection, ReconcilingStore, Record,
    SourceError, SyncError,
};
use std::sync::Arc;
use std::thread;

use crate::support::{at, ids, reservation, Gate, GatedSource, ReservationsPage};

#[test]
fn approval_round_trip_converges() {
    let page = ReservationsPage::open(vec![reservation("r-1", "reserved"), reservation("r-2", "reserved")]);
    page.live
        .set_pending_due_date("r-1", at("2025-07-01T00:00:00Z"))
        .unwrap();

    page.live.approve_reservation("r-1").unwrap();
    page.source.wait_broadcasts();

    assert_eq!(page.records().len(), 2);
    assert_eq!(page.held("r-1").status, ReservationStatus::Approved);
    assert_eq!(page.source.records()[0].status, ReservationStatus::Approved);
}

#[test]
fn rejected_write_leaves_collection_as_it_was() {
    let page = ReservationsPage::open(vec![reservation("r-1", "approved")]);
    let before = page.records();
    page.source.fail_next(SourceError::Rejected("reservation already returned".into()));

    let err = page.live.return_reservation("r-1").unwrap_err();

    assert_eq!(
        err,
        SyncError::Write(SourceError::Rejected("reservation already returned".into()))
    );
    assert_eq!(page.records(), before);
}

#[test]
fn expired_session_surfaces_as_auth_error() {
    let page = ReservationsPage::open(vec![reservation("r-1", "reserved")]);
    page.source.fail_next(SourceError::Unauthorized("jwt expired".into()));

    let err = page.live.decline_reservation("r-1").unwrap_err();

    assert!(!err.is_recoverable());
    assert_eq!(page.held("r-1").status, ReservationStatus::Reserved);
}

#[test]
fn announcements_crud_with_broadcast() {
    let channel = Arc::new(EmitterChannel::new());
    let names = EventNames::for_collection(Announcement::COLLECTION);
    let source = InMemorySource::new().with_broadcast(channel.clone(), names.clone());
    let live: LiveCollection<Announcement> =
        LiveCollection::new(Arc::new(source.clone()), ReconcilingStore::new());
    live.initialize().unwrap();
    live.attach(channel.clone(), &names);

    live.create(&json!({ "_id": "a-1", "title": "Book fair", "content": "Friday, main hall" }))
        .unwrap();
    source.wait_broadcasts();
    assert_eq!(live.records().unwrap().len(), 1);

    live.update("a-1", &json!({ "content": "Saturday, main hall" }), |a| {
        a.content = "Saturday, main hall".into()
    })
    .unwrap();
    source.wait_broadcasts();
    assert_eq!(live.records().unwrap()[0].content, "Saturday, main hall");

    live.delete("a-1").unwrap();
    assert!(live.records().unwrap().is_empty());
    assert!(source.records().is_empty());
}

fn gated_reservations(
    records: Vec<Reservation>,
) -> (
    Arc<GatedSource<Reservation>>,
    Gate,
    LiveCollection<Reservation, ReservationLocal>,
) {
    let (source, gate) = GatedSource::new(InMemorySource::with_records(records));
    let live = LiveCollection::new(source.clone(), ReconcilingStore::new());
    live.initialize().unwrap();
    (source, gate, live)
}

#[test]
fn delete_during_refresh_is_not_undone_by_its_snapshot() {
    let (source, gate, live) =
        gated_reservations(vec![reservation("r-1", "reserved"), reservation("r-2", "reserved")]);

    source.arm();
    let refreshing = live.clone();
    let worker = thread::spawn(move || refreshing.refresh());
    gate.entered.recv().unwrap();

    // The fetch already read r-1; the delete lands while it is in flight.
    live.delete("r-1").unwrap();
    gate.release.send(()).unwrap();
    worker.join().unwrap().unwrap().unwrap();

    assert_eq!(ids(&live.records().unwrap()), vec!["r-2"]);
    assert!(source.inner.records().iter().all(|r| r.id != "r-1"));
}

#[test]
fn optimistic_update_during_refresh_is_not_undone_by_its_snapshot() {
    let (source, gate, live) = gated_reservations(vec![reservation("r-1", "approved")]);
    source.without_echo();

    source.arm();
    let refreshing = live.clone();
    let worker = thread::spawn(move || refreshing.refresh());
    gate.entered.recv().unwrap();

    live.return_reservation("r-1").unwrap();
    gate.release.send(()).unwrap();
    let summary = worker.join().unwrap().unwrap().unwrap();

    assert_eq!(summary.replayed, 1);
    assert_eq!(
        live.get("r-1").unwrap().unwrap().record.status,
        ReservationStatus::Returned
    );
}

#[test]
fn failed_delete_during_refresh_keeps_the_record() {
    let (source, gate, live) =
        gated_reservations(vec![reservation("r-1", "reserved"), reservation("r-2", "reserved")]);

    source.arm();
    let refreshing = live.clone();
    let worker = thread::spawn(move || refreshing.refresh());
    gate.entered.recv().unwrap();

    source.inner.fail_next(SourceError::Network("offline".into()));
    assert!(live.delete("r-1").is_err());
    gate.release.send(()).unwrap();
    worker.join().unwrap().unwrap().unwrap();

    assert_eq!(ids(&live.records().unwrap()), vec!["r-1", "r-2"]);
}
