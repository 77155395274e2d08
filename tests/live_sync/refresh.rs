//! Snapshots merged into a live collection: local state, deletions and
//! refreshes racing push events.

use std::sync::Arc;
use std::thread;

use shelf_sync::models::{Reservation, ReservationLocal, ReservationStatus};
use shelf_sync::{EmitterChannel, InMemorySource, LiveCollection, ReconcilingStore};

use crate::support::{at, ids, push, reservation, GatedSource, ReservationsPage};

#[test]
fn local_state_survives_refresh() {
    let page = ReservationsPage::open(vec![reservation("r-1", "reserved")]);
    let due = at("2025-07-01T00:00:00Z");
    page.live.set_pending_due_date("r-1", due).unwrap();

    let mut renamed = reservation("r-1", "reserved");
    renamed.reserved_at = Some(at("2025-06-01T08:00:00Z"));
    page.source.set_records(vec![renamed]);
    page.live.refresh().unwrap();

    let entry = page.live.get("r-1").unwrap().unwrap();
    assert_eq!(entry.local.pending_due_date, Some(due));
    assert_eq!(entry.record.reserved_at, Some(at("2025-06-01T08:00:00Z")));
}

#[test]
fn omitted_key_loses_record_and_local_state() {
    let page = ReservationsPage::open(vec![reservation("r-1", "reserved"), reservation("r-2", "reserved")]);
    page.live
        .set_pending_due_date("r-1", at("2025-07-01T00:00:00Z"))
        .unwrap();

    page.source.set_records(vec![reservation("r-2", "reserved")]);
    let summary = page.live.refresh().unwrap().unwrap();

    assert_eq!(summary.removed, 1);
    assert!(page.live.get("r-1").unwrap().is_none());
    assert!(!page.live.set_pending_due_date("r-1", at("2025-07-02T00:00:00Z")).unwrap());

    // Reappearing later starts from default local state.
    page.source
        .set_records(vec![reservation("r-1", "reserved"), reservation("r-2", "reserved")]);
    page.live.refresh().unwrap();
    assert_eq!(page.live.get("r-1").unwrap().unwrap().local, ReservationLocal::default());
}

#[test]
fn initialize_clears_local_state() {
    let page = ReservationsPage::open(vec![reservation("r-1", "reserved")]);
    page.live
        .set_pending_due_date("r-1", at("2025-07-01T00:00:00Z"))
        .unwrap();

    page.live.initialize().unwrap();

    assert_eq!(page.live.get("r-1").unwrap().unwrap().local.pending_due_date, None);
}

#[test]
fn server_side_delete_is_only_seen_on_refresh() {
    let page = ReservationsPage::open(vec![reservation("r-1", "reserved"), reservation("r-2", "reserved")]);

    page.source.set_records(vec![reservation("r-2", "reserved")]);
    push(&page.channel, "reservationUpdated", &reservation("r-2", "approved"));
    assert_eq!(page.records().len(), 2);

    page.live.refresh().unwrap();
    assert_eq!(ids(&page.records()), vec!["r-2"]);
}

#[test]
fn push_during_refresh_is_not_rolled_back() {
    let channel = Arc::new(EmitterChannel::new());
    let backend = InMemorySource::with_records(vec![reservation("r-1", "reserved")]);
    let (source, gate) = GatedSource::new(backend);
    let live: LiveCollection<Reservation, ReservationLocal> =
        LiveCollection::new(source.clone(), ReconcilingStore::new());
    live.initialize().unwrap();
    live.attach(channel.clone(), &Reservation::events());

    source.arm();
    let refreshing = live.clone();
    let worker = thread::spawn(move || refreshing.refresh());
    gate.entered.recv().unwrap();

    // The fetch already read "reserved"; the approval lands while it is in
    // flight.
    push(&channel, "reservationUpdated", &reservation("r-1", "approved"));
    push(&channel, "reservationCreated", &reservation("r-2", "reserved"));
    gate.release.send(()).unwrap();
    let summary = worker.join().unwrap().unwrap().unwrap();

    assert_eq!(summary.replayed, 2);
    assert_eq!(live.get("r-1").unwrap().unwrap().record.status, ReservationStatus::Approved);
    assert!(live.get("r-2").unwrap().is_some());
}

#[test]
fn overlapping_refresh_discards_the_older_result() {
    let backend = InMemorySource::with_records(vec![reservation("r-1", "reserved")]);
    let (source, gate) = GatedSource::new(backend.clone());
    let live: LiveCollection<Reservation, ReservationLocal> =
        LiveCollection::new(source.clone(), ReconcilingStore::new());
    live.initialize().unwrap();

    source.arm();
    let slow = live.clone();
    let worker = thread::spawn(move || slow.refresh());
    gate.entered.recv().unwrap();

    backend.set_records(vec![reservation("r-1", "approved")]);
    assert!(live.refresh().unwrap().is_some());

    gate.release.send(()).unwrap();
    assert_eq!(worker.join().unwrap().unwrap(), None);
    assert_eq!(live.get("r-1").unwrap().unwrap().record.status, ReservationStatus::Approved);
}

#[test]
fn channel_is_shared_across_collections() {
    let page = ReservationsPage::open(vec![]);
    let other: LiveCollection<Reservation, ReservationLocal> = LiveCollection::new(
        Arc::new(InMemorySource::new()),
        ReconcilingStore::new(),
    );
    other.attach(page.channel.clone(), &Reservation::events());

    push(&page.channel, "reservationCreated", &reservation("r-1", "reserved"));

    assert_eq!(page.records().len(), 1);
    assert_eq!(other.records().unwrap().len(), 1);

    other.close();
    push(&page.channel, "reservationCreated", &reservation("r-2", "reserved"));

    assert_eq!(page.records().len(), 2);
    assert_eq!(other.records().unwrap().len(), 1);
}
