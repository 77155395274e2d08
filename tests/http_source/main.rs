//! HttpSource against a local axum server.
//!
//! The server runs on its own tokio runtime thread; the blocking client is
//! driven from the test thread.
#![cfg(feature = "http")]


use serde_json::json;
use shelf_sync::models::{Book, LogEntry, LogLocal, Reservation, ReservationLocal, ReservationStatus};
use shelf_sync::{
    CollectionSource, HttpSource, LiveCollection, ReconcilingStore, SourceError, SyncConfig,
    SyncError,
};
use std::sync::Arc;

use server::{TestServer, TOKEN};

fn config(server: &TestServer) -> SyncConfig {
    SyncConfig::new(server.base_url.clone()).with_token(TOKEN)
}

#[test]
fn fetches_bare_book_list() {
    let server = TestServer::start();
    let source: HttpSource<Book> = HttpSource::from_config(&config(&server), Book::endpoint()).unwrap();

    let books = source.fetch_all().unwrap();

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].title, "Noli Me Tangere");
}

#[test]
fn reservations_list_is_unwrapped_from_envelope() {
    let server = TestServer::start();
    let live: LiveCollection<Reservation, ReservationLocal> = LiveCollection::new(
        Arc::new(HttpSource::from_config(&config(&server), Reservation::endpoint()).unwrap()),
        ReconcilingStore::new().with_filter(Reservation::is_listed),
    );

    live.initialize().unwrap();

    let held = live.records().unwrap();
    assert_eq!(held.len(), 1, "cancelled reservations are filtered out");
    assert_eq!(held[0].student_name(), "Ana Cruz");
}

#[test]
fn missing_token_is_unauthorized() {
    let server = TestServer::start();
    let source: HttpSource<Reservation> =
        HttpSource::new(server.base_url.clone(), Reservation::endpoint()).unwrap();

    let err = source.fetch_all().unwrap_err();

    assert!(matches!(err, SourceError::Unauthorized(_)));
    assert_eq!(SyncError::fetch(err), SyncError::Auth("invalid token".into()));
}

#[test]
fn status_patch_round_trip() {
    let server = TestServer::start();
    let live: LiveCollection<Reservation, ReservationLocal> = LiveCollection::new(
        Arc::new(HttpSource::from_config(&config(&server), Reservation::endpoint()).unwrap()),
        ReconcilingStore::new().with_filter(Reservation::is_listed),
    );
    live.initialize().unwrap();
    live.set_pending_due_date("r-1", server::due_date()).unwrap();

    let echo = live.approve_reservation("r-1").unwrap().unwrap();

    assert_eq!(echo.status, ReservationStatus::Approved);
    assert_eq!(echo.due_date, Some(server::due_date()));
    let held = live.get("r-1").unwrap().unwrap().record;
    assert_eq!(held.due_date, Some(server::due_date()));
    assert_eq!(held.student_name(), "Ana Cruz");
}

#[test]
fn server_message_is_kept_on_failure() {
    let server = TestServer::start();
    let source: HttpSource<Reservation> =
        HttpSource::from_config(&config(&server), Reservation::endpoint()).unwrap();

    let err = source
        .update("r-locked", &json!({ "status": "returned" }))
        .unwrap_err();

    assert_eq!(
        err,
        SourceError::Server {
            status: 400,
            message: "Book is not borrowed".into()
        }
    );
}

#[test]
fn unsupported_route_fails_without_request() {
    let server = TestServer::start();
    let source: HttpSource<Reservation> =
        HttpSource::from_config(&config(&server), Reservation::endpoint()).unwrap();

    assert_eq!(source.delete("r-1").unwrap_err(), SourceError::Unsupported("delete"));
}

#[test]
fn book_crud_round_trip() {
    let server = TestServer::start();
    let live: LiveCollection<Book> = LiveCollection::new(
        Arc::new(HttpSource::from_config(&config(&server), Book::endpoint()).unwrap()),
        ReconcilingStore::new(),
    );
    live.initialize().unwrap();

    let created = live
        .create(&json!({ "title": "Ibong Adarna", "author": "Anonymous" }))
        .unwrap()
        .unwrap();
    assert_eq!(live.records().unwrap().len(), 3);

    live.update(&created.id, &json!({ "author": "Unknown" }), |b| b.author = "Unknown".into())
        .unwrap();
    assert_eq!(live.get(&created.id).unwrap().unwrap().record.author, "Unknown");

    live.delete(&created.id).unwrap();
    assert_eq!(live.records().unwrap().len(), 2);
    assert_eq!(server.book_count(), 2);

    let err = live.delete("b-missing");
    assert!(matches!(err, Err(SyncError::UnknownRecord { .. })));
}

#[test]
fn time_out_posts_log_id_in_body() {
    let server = TestServer::start();
    let live: LiveCollection<LogEntry, LogLocal> = LiveCollection::new(
        Arc::new(HttpSource::from_config(&config(&server), LogEntry::endpoint()).unwrap()),
        ReconcilingStore::new().with_order(LogEntry::order_policy()),
    );
    live.initialize().unwrap();
    live.set_print_quantity("log-1", 2).unwrap();

    let closed = live.time_out("log-1").unwrap().unwrap();

    assert_eq!(closed.print_count, 2);
    assert!(closed.time_out.is_some());
    assert_eq!(server.last_timeout(), Some(json!({ "logId": "log-1", "printCount": 2 })));
}
