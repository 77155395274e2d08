//! The visitor log: time-ins arrive over the channel, open visits first.

use serde_json::json;
use shelf_sync::models::LogStatus;

use crate::support::{at, ids, open_log, push_raw, LogsPage};

#[test]
fn time_in_appears_through_push_only() {
    let now = at("2025-06-02T09:00:00Z");
    let page = LogsPage::open(vec![], now);

    let echoed = page.live.time_in(" 2025-014 ").unwrap();
    assert_eq!(echoed.map(|log| log.id), Some("log-2025-014".to_string()));
    assert_eq!(page.source.calls()[1].body, Some(json!({ "studentId": "2025-014" })));

    page.source.wait_broadcasts();
    let held = page.live.records().unwrap();
    assert_eq!(ids(&held), vec!["log-2025-014"]);
    assert_eq!(held[0].student_code(), "2025-014");
}

#[test]
fn open_visits_sort_before_closed_ones() {
    let now = at("2025-06-02T12:00:00Z");
    let mut closed = open_log("log-1", "2025-001", at("2025-06-02T11:00:00Z"));
    closed.time_out = Some(at("2025-06-02T11:30:00Z"));
    let older_open = open_log("log-2", "2025-002", at("2025-06-02T08:00:00Z"));
    let newer_open = open_log("log-3", "2025-003", at("2025-06-02T10:00:00Z"));
    let page = LogsPage::open(vec![closed, older_open, newer_open], now);

    assert_eq!(ids(&page.live.records().unwrap()), vec!["log-3", "log-2", "log-1"]);
}

#[test]
fn time_out_sends_typed_print_quantity() {
    let now = at("2025-06-02T12:00:00Z");
    let page = LogsPage::open(vec![open_log("log-1", "2025-001", at("2025-06-02T08:00:00Z"))], now);
    page.live.set_print_quantity("log-1", 3).unwrap();

    let closed = page.live.time_out("log-1").unwrap().unwrap();
    page.source.wait_broadcasts();

    let call = page.source.calls().pop().unwrap();
    assert_eq!(call.id.as_deref(), Some("log-1"));
    assert_eq!(call.body, Some(json!({ "printCount": 3 })));
    assert_eq!(closed.status, LogStatus::CheckedOut);

    let entry = page.live.get("log-1").unwrap().unwrap();
    assert_eq!(entry.record.print_count, 3);
    assert_eq!(entry.local.print_quantity, 0);
}

#[test]
fn already_printed_visit_sends_no_print_count() {
    let now = at("2025-06-02T12:00:00Z");
    let mut printed = open_log("log-1", "2025-001", at("2025-06-02T08:00:00Z"));
    printed.already_printed = true;
    let page = LogsPage::open(vec![printed], now);
    page.live.set_print_quantity("log-1", 2).unwrap();

    page.live.time_out("log-1").unwrap();

    assert_eq!(page.source.calls().pop().unwrap().body, Some(json!({})));
}

#[test]
fn enveloped_log_event_is_unwrapped() {
    let now = at("2025-06-02T12:00:00Z");
    let page = LogsPage::open(vec![open_log("log-1", "2025-001", at("2025-06-02T08:00:00Z"))], now);

    push_raw(
        &page.channel,
        "logUpdated",
        json!({
            "type": "print",
            "log": {
                "_id": "log-1",
                "student": { "studentId": "2025-001", "firstName": "Test", "lastName": "2025-001" },
                "timeIn": "2025-06-02T08:00:00Z",
                "status": "Checked In",
                "printCount": 2,
                "alreadyPrinted": true
            }
        }),
    );

    let held = page.live.get("log-1").unwrap().unwrap().record;
    assert_eq!(held.print_count, 2);
    assert!(held.already_printed);
}
